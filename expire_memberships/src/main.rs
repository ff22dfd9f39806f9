use aws_lambda_events::event::cloudwatch_events::CloudWatchEvent;
use club_common::store::{self, Table};
use expire_memberships::{function_handler, MEMBERS_TABLE};
use lambda_runtime::{run, service_fn, Error, LambdaEvent};

#[tokio::main]
async fn main() -> Result<(), Error> {
    club_common::logging::init();

    let config = store::sdk_config().await;
    let ddb_client = store::dynamodb_client(&config);
    let members = Table::from_env(&ddb_client, MEMBERS_TABLE)?;

    run(service_fn(|event: LambdaEvent<CloudWatchEvent>| function_handler(&members, event))).await
}
