use club_common::http;
use club_common::store::{self, Table};
use lambda_http::{run, service_fn, Body, Error, Request, Response};
use orders::{Orders, CARTS_TABLE, ORDERS_TABLE, PRODUCTS_TABLE};
use tracing::debug;

async fn function_handler(orders: &Orders, event: Request) -> Result<Response<Body>, Error> {
    debug!("orders request: {} {}", event.method(), event.uri().path());
    http::respond(orders.handle(&event).await)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    club_common::logging::init();

    let config = store::sdk_config().await;
    let ddb_client = store::dynamodb_client(&config);
    let orders = Orders::new(
        Table::from_env(&ddb_client, ORDERS_TABLE)?,
        Table::from_env(&ddb_client, CARTS_TABLE)?,
        Table::from_env(&ddb_client, PRODUCTS_TABLE)?,
    );

    run(service_fn(|event: Request| function_handler(&orders, event))).await
}
