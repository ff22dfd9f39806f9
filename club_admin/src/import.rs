use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use club_common::model::{Member, MemberStatus, MembershipType};
use club_common::store::{self, Table};
use club_common::Region;
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

/// Import members from a CSV export.
#[derive(Debug, clap::Parser)]
#[command(long_about = "Import members from a CSV export.

Expected headers:
  first_name,last_name,email,phone,street,postal_code,city,country,
  birth_date,region,membership_type,member_since,membership_ends

Dates may be written as YYYY-MM-DD or DD-MM-YYYY. Rows with an unknown region
or a missing name or email are reported and skipped, as are emails that
already belong to a member.")]
pub struct ImportCommand {
    /// CSV file to import.
    #[arg(long)]
    pub file: PathBuf,

    /// Members table name.
    #[arg(long, env = "MEMBERS_TABLE")]
    pub members_table: String,

    /// Report what would change without writing anything.
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Debug, Deserialize)]
pub struct ImportRow {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub street: Option<String>,
    pub postal_code: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub birth_date: Option<String>,
    pub region: Option<String>,
    pub membership_type: Option<String>,
    pub member_since: Option<String>,
    pub membership_ends: Option<String>,
}

#[derive(Debug, PartialEq, Eq)]
pub struct Rejected {
    /// Line in the file, header included.
    pub line: usize,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct ImportReport {
    pub members: Vec<Member>,
    pub rejected: Vec<Rejected>,
}

fn clean(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parse_date(field: &str, value: Option<String>) -> Result<Option<NaiveDate>, String> {
    match clean(value) {
        None => Ok(None),
        Some(v) => NaiveDate::parse_from_str(&v, "%Y-%m-%d")
            .or_else(|_| NaiveDate::parse_from_str(&v, "%d-%m-%Y"))
            .map(Some)
            .map_err(|_| format!("{} {} is not a date", field, v)),
    }
}

fn parse_membership_type(value: Option<String>) -> Result<MembershipType, String> {
    match clean(value) {
        None => Ok(MembershipType::Full),
        Some(v) => serde_json::from_value(Value::String(v.to_lowercase()))
            .map_err(|_| format!("unknown membership type {}", v)),
    }
}

impl ImportRow {
    pub fn into_member(self, member_id: String, today: NaiveDate) -> Result<Member, String> {
        let first_name = clean(self.first_name).ok_or("missing first_name")?;
        let last_name = clean(self.last_name).ok_or("missing last_name")?;
        let email = clean(self.email)
            .filter(|e| e.contains('@'))
            .ok_or("missing or invalid email")?
            .to_lowercase();
        let raw_region = clean(self.region).ok_or("missing region")?;
        let region = Region::normalize(&raw_region).ok_or_else(|| format!("unknown region {}", raw_region))?;
        let membership_ends = parse_date("membership_ends", self.membership_ends)?;
        let status = match membership_ends {
            Some(end) if end < today => MemberStatus::Expired,
            _ => MemberStatus::Active,
        };
        let now = Utc::now();
        Ok(Member {
            member_id,
            first_name,
            last_name,
            email,
            phone: clean(self.phone),
            street: clean(self.street),
            postal_code: clean(self.postal_code).map(|p| p.to_uppercase()),
            city: clean(self.city),
            country: clean(self.country),
            birth_date: parse_date("birth_date", self.birth_date)?,
            region: region.name().to_string(),
            status,
            membership_type: parse_membership_type(self.membership_type)?,
            member_since: parse_date("member_since", self.member_since)?,
            membership_ends,
            cognito_sub: None,
            motorcycle_brand: None,
            motorcycle_model: None,
            reminder_sent_for: None,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Parses the CSV, skipping rows that are invalid, repeat an email seen earlier
/// in the file, or whose email is in `existing`.
pub fn parse_members<R: Read>(reader: R, existing: &HashSet<String>, today: NaiveDate) -> Result<ImportReport> {
    let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut report = ImportReport::default();
    let mut seen = HashSet::new();
    for (i, row) in csv_reader.deserialize::<ImportRow>().enumerate() {
        let line = i + 2;
        let row = match row {
            Ok(row) => row,
            Err(e) => {
                report.rejected.push(Rejected { line, reason: e.to_string() });
                continue;
            }
        };
        match row.into_member(uuid::Uuid::new_v4().to_string(), today) {
            Ok(member) if existing.contains(&member.email) => report.rejected.push(Rejected {
                line,
                reason: format!("{} is already a member", member.email),
            }),
            Ok(member) if !seen.insert(member.email.to_owned()) => report.rejected.push(Rejected {
                line,
                reason: format!("{} appears more than once", member.email),
            }),
            Ok(member) => report.members.push(member),
            Err(reason) => report.rejected.push(Rejected { line, reason }),
        }
    }
    Ok(report)
}

pub async fn run(cmd: ImportCommand) -> Result<()> {
    let file = File::open(&cmd.file).with_context(|| format!("opening {}", cmd.file.display()))?;
    let config = store::sdk_config().await;
    let members = Table::new(store::dynamodb_client(&config), cmd.members_table);

    let existing: HashSet<String> = members
        .scan::<Member>()
        .await
        .context("reading existing members")?
        .into_iter()
        .map(|m| m.email.to_lowercase())
        .collect();
    let report = parse_members(file, &existing, Utc::now().date_naive())?;

    for rejected in &report.rejected {
        warn!("line {}: {}", rejected.line, rejected.reason);
    }
    if cmd.dry_run {
        for member in &report.members {
            println!("would import {} <{}> ({})", member.full_name(), member.email, member.region);
        }
    } else {
        for member in &report.members {
            members
                .put(member)
                .await
                .with_context(|| format!("storing {}", member.email))?;
        }
    }
    info!("{} members imported, {} rows skipped", report.members.len(), report.rejected.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "first_name,last_name,email,phone,street,postal_code,city,country,birth_date,region,membership_type,member_since,membership_ends\n";

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 6, 1).unwrap()
    }

    fn import(rows: &str, existing: &[&str]) -> ImportReport {
        let existing: HashSet<String> = existing.iter().map(|e| e.to_string()).collect();
        parse_members(format!("{}{}", HEADER, rows).as_bytes(), &existing, today()).unwrap()
    }

    #[test]
    fn valid_rows_become_members() {
        let report = import(
            "Kees,Bakker,Kees@Example.org,0611111111,Dorpsstraat 1,1234 ab,Zwolle,NL,12-03-1968,gelderland,family,2010-01-01,2026-12-31\n",
            &[],
        );
        assert!(report.rejected.is_empty());
        let member = &report.members[0];
        assert_eq!(member.email, "kees@example.org");
        assert_eq!(member.region, "Oost");
        assert_eq!(member.postal_code.as_deref(), Some("1234 AB"));
        assert_eq!(member.birth_date, NaiveDate::from_ymd_opt(1968, 3, 12));
        assert_eq!(member.membership_type, MembershipType::Family);
        assert_eq!(member.status, MemberStatus::Active);
    }

    #[test]
    fn lapsed_rows_are_imported_as_expired() {
        let report = import("Els,Smit,els@example.org,,,,,,,Utrecht,,,2025-12-31\n", &[]);
        assert_eq!(report.members[0].status, MemberStatus::Expired);
        assert_eq!(report.members[0].membership_type, MembershipType::Full);
    }

    #[test]
    fn bad_rows_are_reported_with_line_numbers() {
        let report = import(
            "Jan,Visser,jan@example.org,,,,,,,Atlantis,,,\n\
             ,Mulder,mulder@example.org,,,,,,,Limburg,,,\n\
             Piet,de Boer,piet@example.org,,,,,,31-02-1970,Limburg,,,\n\
             Bram,Dekker,bram@example.org,,,,,,,Limburg,platinum,,\n\
             Sanne,Bos,sanne@example.org,,,,,,,Friesland,,,\n",
            &[],
        );
        assert_eq!(report.members.len(), 1);
        let lines: Vec<usize> = report.rejected.iter().map(|r| r.line).collect();
        assert_eq!(lines, vec![2, 3, 4, 5]);
        assert_eq!(report.rejected[0].reason, "unknown region Atlantis");
        assert_eq!(report.rejected[1].reason, "missing first_name");
    }

    #[test]
    fn duplicates_are_skipped() {
        let report = import(
            "Kees,Bakker,kees@example.org,,,,,,,Oost,,,\n\
             Kees,Bakker,KEES@example.org,,,,,,,Oost,,,\n\
             Anne,de Vries,anne@example.org,,,,,,,Utrecht,,,\n",
            &["anne@example.org"],
        );
        assert_eq!(report.members.len(), 1);
        assert_eq!(report.rejected[0].reason, "kees@example.org appears more than once");
        assert_eq!(report.rejected[1].reason, "anne@example.org is already a member");
    }
}
