use carts::{Carts, CARTS_TABLE, PRODUCTS_TABLE};
use club_common::http;
use club_common::store::{self, Table};
use lambda_http::{run, service_fn, Body, Error, Request, Response};
use tracing::debug;

async fn function_handler(carts: &Carts, event: Request) -> Result<Response<Body>, Error> {
    debug!("cart request: {} {}", event.method(), event.uri().path());
    http::respond(carts.handle(&event).await)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    club_common::logging::init();

    let config = store::sdk_config().await;
    let ddb_client = store::dynamodb_client(&config);
    let carts = Carts::new(
        Table::from_env(&ddb_client, CARTS_TABLE)?,
        Table::from_env(&ddb_client, PRODUCTS_TABLE)?,
    );

    run(service_fn(|event: Request| function_handler(&carts, event))).await
}
