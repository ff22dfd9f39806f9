use std::collections::HashMap;

use aws_sdk_dynamodb::model::AttributeValue;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ClubError;
use crate::store::{self, Item, Record};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    pub quantity: u32,
}

/// One cart per user, keyed by the Cognito `sub`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    pub cart_id: String,
    pub items: Vec<CartItem>,
    pub updated_at: DateTime<Utc>,
}

impl Cart {
    pub fn empty(owner: &str) -> Cart {
        Cart {
            cart_id: owner.to_string(),
            items: vec![],
            updated_at: Utc::now(),
        }
    }

    /// Merges lines for the same product and size.
    pub fn merge_lines(items: Vec<CartItem>) -> Result<Vec<CartItem>, ClubError> {
        let mut merged: Vec<CartItem> = Vec::with_capacity(items.len());
        for item in items {
            match merged
                .iter_mut()
                .find(|m| m.product_id == item.product_id && m.size == item.size)
            {
                Some(existing) => {
                    existing.quantity = existing
                        .quantity
                        .checked_add(item.quantity)
                        .ok_or_else(|| ClubError::bad_request(format!("quantity for {} is too large", item.product_id)))?;
                }
                None => merged.push(item),
            }
        }
        Ok(merged)
    }
}

impl Record for Cart {
    const KEY: &'static str = "cart_id";
    const KIND: &'static str = "cart";

    fn key(&self) -> &str {
        &self.cart_id
    }

    fn to_item(&self) -> Item {
        let items = self
            .items
            .iter()
            .map(|line| {
                let mut m = HashMap::from([
                    ("product_id".to_string(), store::s(&line.product_id)),
                    ("quantity".to_string(), store::n(line.quantity)),
                ]);
                store::put_opt(&mut m, "size", line.size.as_deref().map(store::s));
                AttributeValue::M(m)
            })
            .collect();
        Item::from([
            ("cart_id".to_string(), store::s(&self.cart_id)),
            ("items".to_string(), AttributeValue::L(items)),
            ("updated_at".to_string(), store::timestamp(self.updated_at)),
        ])
    }

    fn from_item(item: &Item) -> Result<Self, ClubError> {
        let items = store::get_maps(item, "items")
            .into_iter()
            .map(|m| {
                Ok(CartItem {
                    product_id: store::get_s(m, "product_id")?,
                    size: store::get_s_opt(m, "size"),
                    quantity: store::get_n(m, "quantity")?,
                })
            })
            .collect::<Result<Vec<_>, ClubError>>()?;
        Ok(Cart {
            cart_id: store::get_s(item, "cart_id")?,
            items,
            updated_at: store::get_timestamp(item, "updated_at").unwrap_or_else(Utc::now),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(product: &str, size: Option<&str>, quantity: u32) -> CartItem {
        CartItem {
            product_id: product.to_string(),
            size: size.map(str::to_string),
            quantity,
        }
    }

    #[test]
    fn merge_same_product_and_size() {
        let merged = Cart::merge_lines(vec![
            line("p-1", Some("M"), 1),
            line("p-2", None, 1),
            line("p-1", Some("M"), 2),
            line("p-1", Some("L"), 1),
        ])
        .unwrap();
        assert_eq!(
            merged,
            vec![line("p-1", Some("M"), 3), line("p-2", None, 1), line("p-1", Some("L"), 1)]
        );
    }

    #[test]
    fn merged_quantity_must_fit() {
        let merged = Cart::merge_lines(vec![line("p-1", None, u32::MAX), line("p-1", None, 6)]);
        assert!(matches!(merged, Err(ClubError::BadRequest(_))));
        assert!(Cart::merge_lines(vec![line("p-1", None, u32::MAX), line("p-1", Some("M"), 6)]).is_ok());
    }

    #[test]
    fn item_round_trip() {
        let cart = Cart {
            items: vec![line("p-1", Some("M"), 2), line("p-9", None, 1)],
            ..Cart::empty("sub-1")
        };
        assert_eq!(Cart::from_item(&cart.to_item()).unwrap(), cart);
    }
}
