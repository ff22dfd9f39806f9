use std::collections::HashMap;

use aws_lambda_events::event::cloudwatch_events::CloudWatchEvent;
use aws_sdk_sesv2 as ses;
use aws_sdk_sesv2::model::{Body, Content, Destination, EmailContent, Message};
use chrono::NaiveDate;
use club_common::model::{Member, MemberStatus};
use club_common::schedule::reference_date;
use club_common::store::{self, Table};
use club_common::ClubError;
use lambda_runtime::{Error, LambdaEvent};
use tracing::{debug, error, info};

pub const MEMBERS_TABLE: &str = "MEMBERS_TABLE";
pub const SENDER_ADDRESS: &str = "SENDER_ADDRESS";
pub const REMINDER_DAYS: &str = "REMINDER_DAYS";
pub const DEFAULT_REMINDER_DAYS: i64 = 30;

pub fn reminder_days(raw: Option<&str>) -> Result<i64, ClubError> {
    match raw.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(DEFAULT_REMINDER_DAYS),
        Some(v) => match v.parse::<i64>() {
            Ok(days) if days >= 0 => Ok(days),
            _ => Err(ClubError::Config(format!("{}={}", REMINDER_DAYS, v))),
        },
    }
}

pub fn due(members: &[Member], today: NaiveDate, days: i64) -> Vec<&Member> {
    members.iter().filter(|m| m.needs_reminder(today, days)).collect()
}

#[derive(Debug, PartialEq, Eq)]
pub struct Reminder {
    pub to: String,
    pub subject: String,
    pub text: String,
}

impl Reminder {
    pub fn for_member(member: &Member, ends: NaiveDate) -> Reminder {
        Reminder {
            to: member.email.to_owned(),
            subject: format!("Your membership ends on {}", ends.format("%d-%m-%Y")),
            text: format!(
                "Dear {},\n\n\
                 Your club membership ends on {}. Renew in time to keep your \
                 membership, your access to the webshop and the regional rides.\n\n\
                 Membership number: {}\n\n\
                 Kind regards,\nThe membership administration",
                member.first_name,
                ends.format("%d-%m-%Y"),
                member.member_id
            ),
        }
    }
}

pub struct Reminders {
    members: Table,
    ses_client: ses::Client,
    sender: String,
    days: i64,
}

impl Reminders {
    pub fn new(members: Table, ses_client: ses::Client, sender: String, days: i64) -> Reminders {
        Reminders { members, ses_client, sender, days }
    }

    async fn send(&self, reminder: &Reminder) -> Result<(), ClubError> {
        let message = Message::builder()
            .subject(Content::builder().data(&reminder.subject).charset("UTF-8").build())
            .body(Body::builder().text(Content::builder().data(&reminder.text).charset("UTF-8").build()).build())
            .build();
        self.ses_client
            .send_email()
            .from_email_address(&self.sender)
            .destination(Destination::builder().to_addresses(&reminder.to).build())
            .content(EmailContent::builder().simple(message).build())
            .send()
            .await
            .map_err(ClubError::aws)?;
        Ok(())
    }

    pub async fn function_handler(&self, event: LambdaEvent<CloudWatchEvent>) -> Result<(), Error> {
        let today = reference_date(&event.payload);
        let candidates: Vec<Member> = self
            .members
            .scan_where(
                Some("#status = :active AND attribute_exists(#ends)"),
                HashMap::from([
                    ("#status".to_string(), "status".to_string()),
                    ("#ends".to_string(), "membership_ends".to_string()),
                ]),
                HashMap::from([(":active".to_string(), store::enum_value(&MemberStatus::Active))]),
            )
            .await?;

        let mut sent = 0;
        let mut failed = 0;
        for member in due(&candidates, today, self.days) {
            let Some(ends) = member.membership_ends else { continue };
            let reminder = Reminder::for_member(member, ends);
            debug!("reminding {} at {}", member.member_id, reminder.to);
            // One bad address must not block the others.
            if let Err(e) = self.send(&reminder).await {
                error!("reminder to {} failed: {}", member.member_id, e);
                failed += 1;
                continue;
            }
            self.members
                .set_attributes::<Member>(&member.member_id, vec![("reminder_sent_for", store::date(ends))])
                .await?;
            sent += 1;
        }
        info!("sent {} renewal reminders, {} failed, for {}", sent, failed, today);
        Ok(())
    }
}
