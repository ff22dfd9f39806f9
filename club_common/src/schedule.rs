use aws_lambda_events::event::cloudwatch_events::CloudWatchEvent;
use chrono::{NaiveDate, Utc};

/// The day a scheduled run is for: the time of the event, or today when the
/// event carries no time (manual invocations).
pub fn reference_date(event: &CloudWatchEvent) -> NaiveDate {
    if event.time.timestamp() == 0 {
        Utc::now().date_naive()
    } else {
        event.time.date_naive()
    }
}
