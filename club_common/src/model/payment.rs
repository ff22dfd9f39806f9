use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ClubError;
use crate::store::{self, Item, Record};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Ideal,
    BankTransfer,
    Cash,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentKind {
    MembershipFee,
    Webshop,
    Event,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub payment_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member_id: Option<String>,
    pub amount_cents: u64,
    pub method: PaymentMethod,
    pub kind: PaymentKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    pub paid_at: NaiveDate,
    pub recorded_by: String,
    pub created_at: DateTime<Utc>,
}

impl Record for Payment {
    const KEY: &'static str = "payment_id";
    const KIND: &'static str = "payment";

    fn key(&self) -> &str {
        &self.payment_id
    }

    fn to_item(&self) -> Item {
        let mut item = Item::from([
            ("payment_id".to_string(), store::s(&self.payment_id)),
            ("amount_cents".to_string(), store::n(self.amount_cents)),
            ("method".to_string(), store::enum_value(&self.method)),
            ("kind".to_string(), store::enum_value(&self.kind)),
            ("paid_at".to_string(), store::date(self.paid_at)),
            ("recorded_by".to_string(), store::s(&self.recorded_by)),
            ("created_at".to_string(), store::timestamp(self.created_at)),
        ]);
        store::put_opt(&mut item, "order_id", self.order_id.as_deref().map(store::s));
        store::put_opt(&mut item, "member_id", self.member_id.as_deref().map(store::s));
        store::put_opt(&mut item, "reference", self.reference.as_deref().map(store::s));
        item
    }

    fn from_item(item: &Item) -> Result<Self, ClubError> {
        Ok(Payment {
            payment_id: store::get_s(item, "payment_id")?,
            order_id: store::get_s_opt(item, "order_id"),
            member_id: store::get_s_opt(item, "member_id"),
            amount_cents: store::get_n(item, "amount_cents")?,
            method: store::get_enum(item, "method")?,
            kind: store::get_enum(item, "kind")?,
            reference: store::get_s_opt(item, "reference"),
            paid_at: store::get_date(item, "paid_at")
                .ok_or_else(|| ClubError::Malformed("payment without paid_at".to_string()))?,
            recorded_by: store::get_s_opt(item, "recorded_by").unwrap_or_default(),
            created_at: store::get_timestamp(item, "created_at").unwrap_or_else(Utc::now),
        })
    }
}

#[test]
fn payment_item_round_trip() {
    let payment = Payment {
        payment_id: "pay-1".to_string(),
        order_id: Some("o-1".to_string()),
        member_id: None,
        amount_cents: 5000,
        method: PaymentMethod::BankTransfer,
        kind: PaymentKind::Webshop,
        reference: Some("NL12BANK0123".to_string()),
        paid_at: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
        recorded_by: "sub-treasurer".to_string(),
        created_at: Utc::now(),
    };
    let item = payment.to_item();
    assert!(!item.contains_key("member_id"));
    assert_eq!(Payment::from_item(&item).unwrap(), payment);
}
