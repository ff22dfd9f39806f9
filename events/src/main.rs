use club_common::http;
use club_common::store::{self, Table};
use events::{Events, EVENTS_TABLE};
use lambda_http::{run, service_fn, Body, Error, Request, Response};
use tracing::debug;

async fn function_handler(events: &Events, event: Request) -> Result<Response<Body>, Error> {
    debug!("events request: {} {}", event.method(), event.uri().path());
    http::respond(events.handle(&event).await)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    club_common::logging::init();

    let config = store::sdk_config().await;
    let ddb_client = store::dynamodb_client(&config);
    let events = Events::new(Table::from_env(&ddb_client, EVENTS_TABLE)?);

    run(service_fn(|event: Request| function_handler(&events, event))).await
}
