use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ClubError;
use crate::store::{self, Item, Record};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub product_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub price_cents: u64,
    #[serde(default)]
    pub sizes: Vec<String>,
    /// `None` means the product is not stock-managed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock: Option<u32>,
    pub active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn validate(&self) -> Result<(), ClubError> {
        if self.name.trim().is_empty() {
            return Err(ClubError::bad_request("product name is required"));
        }
        if self.price_cents == 0 {
            return Err(ClubError::bad_request("product price must be positive"));
        }
        Ok(())
    }

    /// Checks one cart line against this product.
    pub fn accepts(&self, size: Option<&str>, quantity: u32) -> Result<(), ClubError> {
        if !self.active {
            return Err(ClubError::Conflict(format!("{} is no longer sold", self.name)));
        }
        if quantity == 0 {
            return Err(ClubError::bad_request(format!("quantity for {} must be positive", self.name)));
        }
        match size {
            Some(size) if !self.sizes.iter().any(|s| s == size) => {
                return Err(ClubError::bad_request(format!("{} has no size {}", self.name, size)))
            }
            None if !self.sizes.is_empty() => {
                return Err(ClubError::bad_request(format!("choose a size for {}", self.name)))
            }
            _ => {}
        }
        if let Some(stock) = self.stock {
            if quantity > stock {
                return Err(ClubError::Conflict(format!("only {} of {} left", stock, self.name)));
            }
        }
        Ok(())
    }
}

impl Record for Product {
    const KEY: &'static str = "product_id";
    const KIND: &'static str = "product";

    fn key(&self) -> &str {
        &self.product_id
    }

    fn to_item(&self) -> Item {
        let mut item = Item::from([
            ("product_id".to_string(), store::s(&self.product_id)),
            ("name".to_string(), store::s(&self.name)),
            ("price_cents".to_string(), store::n(self.price_cents)),
            ("sizes".to_string(), store::string_list(self.sizes.as_slice())),
            ("active".to_string(), aws_sdk_dynamodb::model::AttributeValue::Bool(self.active)),
            ("updated_at".to_string(), store::timestamp(self.updated_at)),
        ]);
        store::put_opt(&mut item, "description", self.description.as_deref().map(store::s));
        store::put_opt(&mut item, "stock", self.stock.map(store::n));
        store::put_opt(&mut item, "image_url", self.image_url.as_deref().map(store::s));
        item
    }

    fn from_item(item: &Item) -> Result<Self, ClubError> {
        Ok(Product {
            product_id: store::get_s(item, "product_id")?,
            name: store::get_s(item, "name")?,
            description: store::get_s_opt(item, "description"),
            price_cents: store::get_n(item, "price_cents")?,
            sizes: store::get_string_list(item, "sizes"),
            stock: store::get_n_opt(item, "stock"),
            active: store::get_bool(item, "active").unwrap_or(true),
            image_url: store::get_s_opt(item, "image_url"),
            updated_at: store::get_timestamp(item, "updated_at").unwrap_or_else(Utc::now),
        })
    }
}

#[cfg(test)]
pub(crate) fn sample_product() -> Product {
    Product {
        product_id: "p-1".to_string(),
        name: "Club T-shirt".to_string(),
        description: None,
        price_cents: 2250,
        sizes: vec!["M".to_string(), "L".to_string()],
        stock: Some(3),
        active: true,
        image_url: None,
        updated_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cart_line_checks() {
        let p = sample_product();
        assert!(p.accepts(Some("M"), 2).is_ok());
        assert!(matches!(p.accepts(Some("XXL"), 1), Err(ClubError::BadRequest(_))));
        assert!(matches!(p.accepts(None, 1), Err(ClubError::BadRequest(_))));
        assert!(matches!(p.accepts(Some("L"), 0), Err(ClubError::BadRequest(_))));
        assert!(matches!(p.accepts(Some("L"), 4), Err(ClubError::Conflict(_))));
        let retired = Product { active: false, ..sample_product() };
        assert!(matches!(retired.accepts(Some("L"), 1), Err(ClubError::Conflict(_))));
        let patch = Product { sizes: vec![], stock: None, ..sample_product() };
        assert!(patch.accepts(None, 100).is_ok());
    }

    #[test]
    fn item_round_trip() {
        let p = sample_product();
        assert_eq!(Product::from_item(&p.to_item()).unwrap(), p);
        assert!(Product { price_cents: 0, ..sample_product() }.validate().is_err());
    }
}
