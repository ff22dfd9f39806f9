use anyhow::{Context, Result};
use chrono::Utc;
use club_common::model::Member;
use club_common::regions;
use club_common::store::{self, Table};
use club_common::Region;
use tracing::{info, warn};

/// Rewrite member regions to their canonical names.
#[derive(Debug, clap::Parser)]
pub struct CleanCommand {
    /// Members table name.
    #[arg(long, env = "MEMBERS_TABLE")]
    pub members_table: String,

    /// Report what would change without writing anything.
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Debug, PartialEq, Eq)]
pub enum RegionFix {
    Rename { member_id: String, from: String, to: Region },
    Unknown { member_id: String, raw: String },
}

pub fn plan(members: &[Member]) -> Vec<RegionFix> {
    members
        .iter()
        .filter_map(|m| match Region::normalize(&m.region) {
            Some(region) if region.name() == m.region => None,
            Some(region) => Some(RegionFix::Rename {
                member_id: m.member_id.to_owned(),
                from: m.region.to_owned(),
                to: region,
            }),
            None if regions::is_national(&m.region) => None,
            None => Some(RegionFix::Unknown { member_id: m.member_id.to_owned(), raw: m.region.to_owned() }),
        })
        .collect()
}

pub async fn run(cmd: CleanCommand) -> Result<()> {
    let config = store::sdk_config().await;
    let members = Table::new(store::dynamodb_client(&config), cmd.members_table);
    let all = members.scan::<Member>().await.context("reading members")?;

    let fixes = plan(&all);
    let mut renamed = 0;
    for fix in &fixes {
        match fix {
            RegionFix::Unknown { member_id, raw } => warn!("{}: unrecognised region {:?}", member_id, raw),
            RegionFix::Rename { member_id, from, to } if cmd.dry_run => {
                println!("would rename {:?} to {:?} for {}", from, to.name(), member_id);
            }
            RegionFix::Rename { member_id, from, to } => {
                members
                    .set_attributes::<Member>(member_id, vec![
                        ("region", store::s(to.name())),
                        ("updated_at", store::timestamp(Utc::now())),
                    ])
                    .await
                    .with_context(|| format!("updating {}", member_id))?;
                info!("{}: {:?} -> {:?}", member_id, from, to.name());
                renamed += 1;
            }
        }
    }
    info!("{} members checked, {} renamed, {} fixes planned", all.len(), renamed, fixes.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use club_common::model::{MemberStatus, MembershipType};

    fn member(id: &str, region: &str) -> Member {
        let now = Utc::now();
        Member {
            member_id: id.to_string(),
            first_name: "Tom".to_string(),
            last_name: "Hendriks".to_string(),
            email: format!("{}@example.org", id),
            phone: None,
            street: None,
            postal_code: None,
            city: None,
            country: None,
            birth_date: None,
            region: region.to_string(),
            status: MemberStatus::Active,
            membership_type: MembershipType::Full,
            member_since: None,
            membership_ends: None,
            cognito_sub: None,
            motorcycle_brand: None,
            motorcycle_model: None,
            reminder_sent_for: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn plan_renames_and_reports() {
        let members = vec![
            member("a", "Zuid-Holland"),
            member("b", "zuid holland"),
            member("c", "Drenthe"),
            member("d", "Mars"),
            member("e", "Landelijk"),
            member("f", ""),
        ];
        assert_eq!(
            plan(&members),
            vec![
                RegionFix::Rename { member_id: "b".to_string(), from: "zuid holland".to_string(), to: Region::ZuidHolland },
                RegionFix::Rename { member_id: "c".to_string(), from: "Drenthe".to_string(), to: Region::GroningenDrenthe },
                RegionFix::Unknown { member_id: "d".to_string(), raw: "Mars".to_string() },
                RegionFix::Unknown { member_id: "f".to_string(), raw: "".to_string() },
            ]
        );
    }
}
