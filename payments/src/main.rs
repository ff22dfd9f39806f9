use club_common::http;
use club_common::store::{self, Table};
use lambda_http::{run, service_fn, Body, Error, Request, Response};
use payments::{Payments, MEMBERS_TABLE, ORDERS_TABLE, PAYMENTS_TABLE};
use tracing::debug;

async fn function_handler(payments: &Payments, event: Request) -> Result<Response<Body>, Error> {
    debug!("payments request: {} {}", event.method(), event.uri().path());
    http::respond(payments.handle(&event).await)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    club_common::logging::init();

    let config = store::sdk_config().await;
    let ddb_client = store::dynamodb_client(&config);
    let payments = Payments::new(
        Table::from_env(&ddb_client, PAYMENTS_TABLE)?,
        Table::from_env(&ddb_client, ORDERS_TABLE)?,
        Table::from_env(&ddb_client, MEMBERS_TABLE)?,
    );

    run(service_fn(|event: Request| function_handler(&payments, event))).await
}
