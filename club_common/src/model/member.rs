use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ClubError;
use crate::regions::Region;
use crate::store::{self, Item, Record};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberStatus {
    Pending,
    Active,
    Inactive,
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipType {
    Full,
    Family,
    Honorary,
    Donor,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub member_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<NaiveDate>,
    pub region: String,
    pub status: MemberStatus,
    pub membership_type: MembershipType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member_since: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub membership_ends: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cognito_sub: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub motorcycle_brand: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub motorcycle_model: Option<String>,
    /// Membership end date the last renewal reminder was sent for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reminder_sent_for: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Member {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn canonical_region(&self) -> Option<Region> {
        Region::normalize(&self.region)
    }

    pub fn is_owned_by(&self, sub: &str, email: Option<&str>) -> bool {
        match &self.cognito_sub {
            Some(own) => own == sub,
            None => email.map_or(false, |e| e.trim().eq_ignore_ascii_case(&self.email)),
        }
    }

    /// Active and ending before `today`.
    pub fn is_lapsed(&self, today: NaiveDate) -> bool {
        self.status == MemberStatus::Active && self.membership_ends.map_or(false, |end| end < today)
    }

    /// Active, ending within `days` from `today`, and not yet reminded for
    /// that end date.
    pub fn needs_reminder(&self, today: NaiveDate, days: i64) -> bool {
        match self.membership_ends {
            Some(end) if self.status == MemberStatus::Active => {
                let left = (end - today).num_days();
                (0..=days).contains(&left) && self.reminder_sent_for != Some(end)
            }
            _ => false,
        }
    }
}

impl Record for Member {
    const KEY: &'static str = "member_id";
    const KIND: &'static str = "member";

    fn key(&self) -> &str {
        &self.member_id
    }

    fn to_item(&self) -> Item {
        let mut item = Item::from([
            ("member_id".to_string(), store::s(&self.member_id)),
            ("first_name".to_string(), store::s(&self.first_name)),
            ("last_name".to_string(), store::s(&self.last_name)),
            ("email".to_string(), store::s(&self.email)),
            ("region".to_string(), store::s(&self.region)),
            ("status".to_string(), store::enum_value(&self.status)),
            ("membership_type".to_string(), store::enum_value(&self.membership_type)),
            ("created_at".to_string(), store::timestamp(self.created_at)),
            ("updated_at".to_string(), store::timestamp(self.updated_at)),
        ]);
        store::put_opt(&mut item, "phone", self.phone.as_deref().map(store::s));
        store::put_opt(&mut item, "street", self.street.as_deref().map(store::s));
        store::put_opt(&mut item, "postal_code", self.postal_code.as_deref().map(store::s));
        store::put_opt(&mut item, "city", self.city.as_deref().map(store::s));
        store::put_opt(&mut item, "country", self.country.as_deref().map(store::s));
        store::put_opt(&mut item, "birth_date", self.birth_date.map(store::date));
        store::put_opt(&mut item, "member_since", self.member_since.map(store::date));
        store::put_opt(&mut item, "membership_ends", self.membership_ends.map(store::date));
        store::put_opt(&mut item, "cognito_sub", self.cognito_sub.as_deref().map(store::s));
        store::put_opt(&mut item, "motorcycle_brand", self.motorcycle_brand.as_deref().map(store::s));
        store::put_opt(&mut item, "motorcycle_model", self.motorcycle_model.as_deref().map(store::s));
        store::put_opt(&mut item, "reminder_sent_for", self.reminder_sent_for.map(store::date));
        item
    }

    fn from_item(item: &Item) -> Result<Self, ClubError> {
        let created_at = store::get_timestamp(item, "created_at").unwrap_or_else(Utc::now);
        Ok(Member {
            member_id: store::get_s(item, "member_id")?,
            first_name: store::get_s(item, "first_name")?,
            last_name: store::get_s(item, "last_name")?,
            email: store::get_s(item, "email")?,
            phone: store::get_s_opt(item, "phone"),
            street: store::get_s_opt(item, "street"),
            postal_code: store::get_s_opt(item, "postal_code"),
            city: store::get_s_opt(item, "city"),
            country: store::get_s_opt(item, "country"),
            birth_date: store::get_date(item, "birth_date"),
            region: store::get_s_opt(item, "region").unwrap_or_default(),
            status: store::get_enum(item, "status")?,
            membership_type: store::get_enum(item, "membership_type").unwrap_or(MembershipType::Full),
            member_since: store::get_date(item, "member_since"),
            membership_ends: store::get_date(item, "membership_ends"),
            cognito_sub: store::get_s_opt(item, "cognito_sub"),
            motorcycle_brand: store::get_s_opt(item, "motorcycle_brand"),
            motorcycle_model: store::get_s_opt(item, "motorcycle_model"),
            reminder_sent_for: store::get_date(item, "reminder_sent_for"),
            created_at,
            updated_at: store::get_timestamp(item, "updated_at").unwrap_or(created_at),
        })
    }
}

#[cfg(test)]
pub(crate) fn sample_member() -> Member {
    let now = Utc::now();
    Member {
        member_id: "m-1".to_string(),
        first_name: "Anne".to_string(),
        last_name: "de Vries".to_string(),
        email: "anne@example.org".to_string(),
        phone: Some("0612345678".to_string()),
        street: None,
        postal_code: None,
        city: Some("Utrecht".to_string()),
        country: None,
        birth_date: NaiveDate::from_ymd_opt(1975, 5, 1),
        region: "Utrecht".to_string(),
        status: MemberStatus::Active,
        membership_type: MembershipType::Full,
        member_since: NaiveDate::from_ymd_opt(2001, 1, 1),
        membership_ends: NaiveDate::from_ymd_opt(2026, 12, 31),
        cognito_sub: None,
        motorcycle_brand: Some("Harley-Davidson".to_string()),
        motorcycle_model: None,
        reminder_sent_for: None,
        created_at: now,
        updated_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn item_keeps_optional_fields_out() {
        let member = sample_member();
        let item = member.to_item();
        assert!(!item.contains_key("street"));
        assert_eq!(Member::from_item(&item).unwrap(), member);
    }

    #[test]
    fn legacy_items_without_type_default_to_full() {
        let mut item = sample_member().to_item();
        item.remove("membership_type");
        assert_eq!(Member::from_item(&item).unwrap().membership_type, MembershipType::Full);
        item.remove("status");
        assert!(Member::from_item(&item).is_err());
    }

    #[test]
    fn ownership_prefers_cognito_sub() {
        let mut member = sample_member();
        assert!(member.is_owned_by("anything", Some("ANNE@example.org")));
        member.cognito_sub = Some("sub-1".to_string());
        assert!(!member.is_owned_by("sub-2", Some("anne@example.org")));
        assert!(member.is_owned_by("sub-1", None));
    }

    #[test]
    fn lapse_and_reminder_windows() {
        let member = sample_member();
        assert!(!member.is_lapsed(day(2026, 12, 31)));
        assert!(member.is_lapsed(day(2027, 1, 1)));
        assert!(member.needs_reminder(day(2026, 12, 1), 30));
        assert!(!member.needs_reminder(day(2026, 11, 1), 30));
        assert!(!member.needs_reminder(day(2027, 1, 2), 30));

        let reminded = Member { reminder_sent_for: member.membership_ends, ..member.clone() };
        assert!(!reminded.needs_reminder(day(2026, 12, 1), 30));

        let inactive = Member { status: MemberStatus::Inactive, ..member };
        assert!(!inactive.is_lapsed(day(2027, 1, 1)));
    }
}
