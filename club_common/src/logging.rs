use std::env;

use tracing::Level;

pub const TRACING_DEBUG: &str = "TRACING_DEBUG";

/// Subscriber for the Lambda binaries; `TRACING_DEBUG` switches to debug output.
pub fn init() {
    init_with_level(match env::var(TRACING_DEBUG) {
        Ok(_) => Level::DEBUG,
        Err(_) => Level::INFO,
    })
}

pub fn init_with_level(level: Level) {
    tracing_subscriber::fmt()
        .with_max_level(level)
        // disable printing the name of the module in every log line.
        .with_target(false)
        // disabling time is handy because CloudWatch will add the ingestion time.
        .without_time()
        .init();
}
