use std::collections::HashMap;

use aws_lambda_events::event::cloudwatch_events::CloudWatchEvent;
use chrono::{NaiveDate, Utc};
use club_common::model::{Member, MemberStatus};
use club_common::schedule::reference_date;
use club_common::store::{self, Table};
use lambda_runtime::{Error, LambdaEvent};
use tracing::info;

pub const MEMBERS_TABLE: &str = "MEMBERS_TABLE";

pub fn lapsed(members: &[Member], today: NaiveDate) -> Vec<&Member> {
    members.iter().filter(|m| m.is_lapsed(today)).collect()
}

pub async fn function_handler(members: &Table, event: LambdaEvent<CloudWatchEvent>) -> Result<(), Error> {
    let today = reference_date(&event.payload);
    // Dates are stored as YYYY-MM-DD, so string order is date order.
    let candidates: Vec<Member> = members
        .scan_where(
            Some("#status = :active AND #ends < :today"),
            HashMap::from([
                ("#status".to_string(), "status".to_string()),
                ("#ends".to_string(), "membership_ends".to_string()),
            ]),
            HashMap::from([
                (":active".to_string(), store::enum_value(&MemberStatus::Active)),
                (":today".to_string(), store::date(today)),
            ]),
        )
        .await?;

    let expired = lapsed(&candidates, today);
    let now = Utc::now();
    for member in &expired {
        members
            .set_attributes::<Member>(&member.member_id, vec![
                ("status", store::enum_value(&MemberStatus::Expired)),
                ("updated_at", store::timestamp(now)),
            ])
            .await?;
        info!("membership of {} ({}) expired", member.member_id, member.full_name());
    }
    info!("{} of {} candidates expired for {}", expired.len(), candidates.len(), today);
    Ok(())
}
