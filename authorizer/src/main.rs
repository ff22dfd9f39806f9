use lambda_runtime::{run, service_fn, Error};

#[tokio::main]
async fn main() -> Result<(), Error> {
    club_common::logging::init();

    run(service_fn(authorizer::authorize)).await
}
