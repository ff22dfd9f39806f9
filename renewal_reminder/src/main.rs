use std::env;

use aws_lambda_events::event::cloudwatch_events::CloudWatchEvent;
use aws_sdk_sesv2 as ses;
use club_common::store::{self, Table};
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use renewal_reminder::{reminder_days, Reminders, MEMBERS_TABLE, REMINDER_DAYS, SENDER_ADDRESS};

#[tokio::main]
async fn main() -> Result<(), Error> {
    club_common::logging::init();

    let config = store::sdk_config().await;
    let ddb_client = store::dynamodb_client(&config);
    let reminders = Reminders::new(
        Table::from_env(&ddb_client, MEMBERS_TABLE)?,
        ses::Client::new(&config),
        store::env_var(SENDER_ADDRESS)?,
        reminder_days(env::var(REMINDER_DAYS).ok().as_deref())?,
    );

    run(service_fn(|event: LambdaEvent<CloudWatchEvent>| reminders.function_handler(event))).await
}
