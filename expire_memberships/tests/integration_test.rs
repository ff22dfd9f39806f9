use chrono::{NaiveDate, Utc};
use club_common::model::{Member, MemberStatus, MembershipType};
use expire_memberships::lapsed;

fn member(id: &str, status: MemberStatus, ends: Option<NaiveDate>) -> Member {
    let now = Utc::now();
    Member {
        member_id: id.to_string(),
        first_name: "Jan".to_string(),
        last_name: id.to_string(),
        email: format!("{}@example.org", id),
        phone: None,
        street: None,
        postal_code: None,
        city: None,
        country: None,
        birth_date: None,
        region: "Oost".to_string(),
        status,
        membership_type: MembershipType::Full,
        member_since: None,
        membership_ends: ends,
        cognito_sub: None,
        motorcycle_brand: None,
        motorcycle_model: None,
        reminder_sent_for: None,
        created_at: now,
        updated_at: now,
    }
}

#[test]
fn test_only_active_lapsed_members_expire() {
    let today = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
    let members = vec![
        member("lapsed", MemberStatus::Active, NaiveDate::from_ymd_opt(2025, 12, 31)),
        member("ends-today", MemberStatus::Active, Some(today)),
        member("open-ended", MemberStatus::Active, None),
        member("already-inactive", MemberStatus::Inactive, NaiveDate::from_ymd_opt(2020, 1, 1)),
    ];
    let ids: Vec<&str> = lapsed(&members, today).iter().map(|m| m.member_id.as_str()).collect();
    assert_eq!(ids, vec!["lapsed"]);
}
