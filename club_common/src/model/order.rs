use std::collections::HashMap;

use aws_sdk_dynamodb::model::AttributeValue;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ClubError;
use crate::store::{self, Item, Record};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Paid,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Paid) | (Pending, Cancelled) | (Paid, Shipped) | (Paid, Cancelled) | (Shipped, Delivered)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    pub quantity: u32,
    pub unit_price_cents: u64,
}

impl OrderLine {
    pub fn total_cents(&self) -> Result<u64, ClubError> {
        self.unit_price_cents
            .checked_mul(u64::from(self.quantity))
            .ok_or_else(|| ClubError::bad_request(format!("line total for {} is too large", self.product_id)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: String,
    /// Cognito `sub` of the buyer.
    pub member_sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub lines: Vec<OrderLine>,
    pub total_cents: u64,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn new(order_id: String, member_sub: &str, email: Option<String>, lines: Vec<OrderLine>) -> Result<Order, ClubError> {
        let mut total_cents: u64 = 0;
        for line in &lines {
            total_cents = total_cents
                .checked_add(line.total_cents()?)
                .ok_or_else(|| ClubError::bad_request("order total is too large"))?;
        }
        let now = Utc::now();
        Ok(Order {
            order_id,
            member_sub: member_sub.to_string(),
            email,
            total_cents,
            lines,
            status: OrderStatus::Pending,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn transition(&mut self, next: OrderStatus) -> Result<(), ClubError> {
        if !self.status.can_transition_to(next) {
            return Err(ClubError::Conflict(format!(
                "order {} cannot go from {:?} to {:?}",
                self.order_id, self.status, next
            )));
        }
        self.status = next;
        self.updated_at = Utc::now();
        Ok(())
    }
}

fn line_to_attr(line: &OrderLine) -> AttributeValue {
    let mut m = HashMap::from([
        ("product_id".to_string(), store::s(&line.product_id)),
        ("name".to_string(), store::s(&line.name)),
        ("quantity".to_string(), store::n(line.quantity)),
        ("unit_price_cents".to_string(), store::n(line.unit_price_cents)),
    ]);
    store::put_opt(&mut m, "size", line.size.as_deref().map(store::s));
    AttributeValue::M(m)
}

fn line_from_attr(m: &Item) -> Result<OrderLine, ClubError> {
    Ok(OrderLine {
        product_id: store::get_s(m, "product_id")?,
        name: store::get_s(m, "name")?,
        size: store::get_s_opt(m, "size"),
        quantity: store::get_n(m, "quantity")?,
        unit_price_cents: store::get_n(m, "unit_price_cents")?,
    })
}

impl Record for Order {
    const KEY: &'static str = "order_id";
    const KIND: &'static str = "order";

    fn key(&self) -> &str {
        &self.order_id
    }

    fn to_item(&self) -> Item {
        let mut item = Item::from([
            ("order_id".to_string(), store::s(&self.order_id)),
            ("member_sub".to_string(), store::s(&self.member_sub)),
            ("lines".to_string(), AttributeValue::L(self.lines.iter().map(line_to_attr).collect())),
            ("total_cents".to_string(), store::n(self.total_cents)),
            ("status".to_string(), store::enum_value(&self.status)),
            ("created_at".to_string(), store::timestamp(self.created_at)),
            ("updated_at".to_string(), store::timestamp(self.updated_at)),
        ]);
        store::put_opt(&mut item, "email", self.email.as_deref().map(store::s));
        item
    }

    fn from_item(item: &Item) -> Result<Self, ClubError> {
        let created_at = store::get_timestamp(item, "created_at").unwrap_or_else(Utc::now);
        Ok(Order {
            order_id: store::get_s(item, "order_id")?,
            member_sub: store::get_s(item, "member_sub")?,
            email: store::get_s_opt(item, "email"),
            lines: store::get_maps(item, "lines")
                .into_iter()
                .map(line_from_attr)
                .collect::<Result<Vec<_>, _>>()?,
            total_cents: store::get_n(item, "total_cents")?,
            status: store::get_enum(item, "status")?,
            created_at,
            updated_at: store::get_timestamp(item, "updated_at").unwrap_or(created_at),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order() -> Order {
        Order::new(
            "o-1".to_string(),
            "sub-1",
            None,
            vec![
                OrderLine {
                    product_id: "p-1".to_string(),
                    name: "Club T-shirt".to_string(),
                    size: Some("M".to_string()),
                    quantity: 2,
                    unit_price_cents: 2250,
                },
                OrderLine {
                    product_id: "p-2".to_string(),
                    name: "Patch".to_string(),
                    size: None,
                    quantity: 1,
                    unit_price_cents: 500,
                },
            ],
        )
        .unwrap()
    }

    #[test]
    fn totals_are_summed() {
        assert_eq!(order().total_cents, 5000);
    }

    #[test]
    fn oversized_totals_are_refused() {
        let line = OrderLine {
            product_id: "p-1".to_string(),
            name: "Club jacket".to_string(),
            size: None,
            quantity: u32::MAX,
            unit_price_cents: u64::MAX / 2,
        };
        assert!(matches!(line.total_cents(), Err(ClubError::BadRequest(_))));
        let half = OrderLine { quantity: 1, ..line };
        let total = Order::new("o-2".to_string(), "sub-1", None, vec![half.clone(), half.clone(), half]);
        assert!(matches!(total, Err(ClubError::BadRequest(_))));
    }

    #[test]
    fn status_machine() {
        let mut o = order();
        assert!(o.transition(OrderStatus::Shipped).is_err());
        o.transition(OrderStatus::Paid).unwrap();
        o.transition(OrderStatus::Shipped).unwrap();
        assert!(o.transition(OrderStatus::Cancelled).is_err());
        o.transition(OrderStatus::Delivered).unwrap();
        assert!(!OrderStatus::Delivered.can_transition_to(OrderStatus::Pending));
        assert!(!OrderStatus::Cancelled.can_transition_to(OrderStatus::Paid));
        assert!(OrderStatus::Paid.can_transition_to(OrderStatus::Cancelled));
    }

    #[test]
    fn item_round_trip() {
        let o = order();
        assert_eq!(Order::from_item(&o.to_item()).unwrap(), o);
    }
}
