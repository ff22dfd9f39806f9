use club_common::http;
use club_common::store::{self, Table};
use lambda_http::{run, service_fn, Body, Error, Request, Response};
use members::{Members, MEMBERS_TABLE};
use tracing::debug;

async fn function_handler(members: &Members, event: Request) -> Result<Response<Body>, Error> {
    debug!("members request: {} {}", event.method(), event.uri().path());
    http::respond(members.handle(&event).await)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    club_common::logging::init();

    let config = store::sdk_config().await;
    let ddb_client = store::dynamodb_client(&config);
    let members = Members::new(Table::from_env(&ddb_client, MEMBERS_TABLE)?);

    run(service_fn(|event: Request| function_handler(&members, event))).await
}
