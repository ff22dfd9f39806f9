use club_common::http;
use club_common::store::{self, Table};
use lambda_http::{run, service_fn, Body, Error, Request, Response};
use products::{Products, PRODUCTS_TABLE};
use tracing::debug;

async fn function_handler(products: &Products, event: Request) -> Result<Response<Body>, Error> {
    debug!("products request: {} {}", event.method(), event.uri().path());
    http::respond(products.handle(&event).await)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    club_common::logging::init();

    let config = store::sdk_config().await;
    let ddb_client = store::dynamodb_client(&config);
    let products = Products::new(Table::from_env(&ddb_client, PRODUCTS_TABLE)?);

    run(service_fn(|event: Request| function_handler(&products, event))).await
}
