use anyhow::{Context, Result};
use aws_sdk_cloudwatchlogs as logs;
use chrono::{TimeZone, Utc};
use club_common::store;
use club_common::ClubError;

#[derive(Debug, clap::Parser)]
pub struct InspectCommand {
    /// Lambda function name, or a full log group name starting with `/`.
    #[arg(long)]
    pub function: String,

    /// How far back to look.
    #[arg(long, default_value = "60")]
    pub since_minutes: i64,

    /// CloudWatch Logs filter pattern.
    #[arg(long)]
    pub filter: Option<String>,

    /// Stop after this many events.
    #[arg(long, default_value = "500")]
    pub limit: usize,
}

pub fn log_group_name(function: &str) -> String {
    if function.starts_with('/') {
        function.to_string()
    } else {
        format!("/aws/lambda/{}", function)
    }
}

pub fn format_event(timestamp: Option<i64>, stream: Option<&str>, message: Option<&str>) -> String {
    let time = timestamp
        .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
        .map(|t| t.format("%Y-%m-%d %H:%M:%S%.3f").to_string())
        .unwrap_or_else(|| "-".to_string());
    // Lambda stream names look like 2026/01/01/[$LATEST]<id>; the id is enough.
    let stream = stream
        .map(|s| s.rsplit(']').next().unwrap_or(s))
        .unwrap_or("-");
    format!("{} {} {}", time, stream, message.unwrap_or_default().trim_end())
}

pub async fn run(cmd: InspectCommand) -> Result<()> {
    let config = store::sdk_config().await;
    let client = logs::Client::new(&config);
    let group = log_group_name(&cmd.function);
    let start = Utc::now().timestamp_millis() - cmd.since_minutes * 60 * 1000;

    let mut printed = 0;
    let mut next_token = None;
    loop {
        let output = client
            .filter_log_events()
            .log_group_name(&group)
            .start_time(start)
            .set_filter_pattern(cmd.filter.clone())
            .set_next_token(next_token)
            .send()
            .await
            .map_err(ClubError::aws)
            .with_context(|| format!("reading {}", group))?;
        for event in output.events().unwrap_or_default() {
            println!("{}", format_event(event.timestamp(), event.log_stream_name(), event.message()));
            printed += 1;
            if printed >= cmd.limit {
                return Ok(());
            }
        }
        match output.next_token() {
            Some(token) if !token.is_empty() => next_token = Some(token.to_string()),
            _ => break,
        }
    }
    if printed == 0 {
        eprintln!("no events in {} for the last {} minutes", group, cmd.since_minutes);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_names() {
        assert_eq!(log_group_name("members"), "/aws/lambda/members");
        assert_eq!(log_group_name("/custom/group"), "/custom/group");
    }

    #[test]
    fn events_are_one_line() {
        let line = format_event(Some(0), Some("2026/01/01/[$LATEST]abc123"), Some("INFO started\n"));
        assert_eq!(line, "1970-01-01 00:00:00.000 abc123 INFO started");
        assert_eq!(format_event(None, None, None), "- - ");
    }
}
