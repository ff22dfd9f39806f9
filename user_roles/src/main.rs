use aws_sdk_cognitoidentityprovider as cognito;
use club_common::http;
use club_common::store;
use lambda_http::{run, service_fn, Body, Error, Request, Response};
use tracing::debug;
use user_roles::{UserRoles, USER_POOL_ID};

async fn function_handler(user_roles: &UserRoles, event: Request) -> Result<Response<Body>, Error> {
    debug!("user roles request: {} {}", event.method(), event.uri().path());
    http::respond(user_roles.handle(&event).await)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    club_common::logging::init();

    let config = store::sdk_config().await;
    let user_pool_id = store::env_var(USER_POOL_ID)?;
    let user_roles = UserRoles::new(cognito::Client::new(&config), user_pool_id);

    run(service_fn(|event: Request| function_handler(&user_roles, event))).await
}
