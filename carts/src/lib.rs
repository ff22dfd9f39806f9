use std::collections::HashMap;

use chrono::Utc;
use club_common::http::{self, Reply};
use club_common::model::{Cart, CartItem, Product};
use club_common::store::Table;
use club_common::{ClubError, Permission, Principal};
use lambda_http::http::Method;
use lambda_http::Request;
use serde::{Deserialize, Serialize};
use tracing::info;

pub const CARTS_TABLE: &str = "CARTS_TABLE";
pub const PRODUCTS_TABLE: &str = "PRODUCTS_TABLE";

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateCartRequest {
    items: Vec<CartItem>
}

/// Merges duplicate lines and checks each against the current catalogue.
pub fn checked_lines(items: Vec<CartItem>, products: &HashMap<String, Product>) -> Result<Vec<CartItem>, ClubError> {
    let lines = Cart::merge_lines(items)?;
    for line in &lines {
        let product = products
            .get(&line.product_id)
            .ok_or_else(|| ClubError::bad_request(format!("unknown product {}", line.product_id)))?;
        product.accepts(line.size.as_deref(), line.quantity)?;
    }
    Ok(lines)
}

pub struct Carts {
    carts: Table,
    products: Table,
}

impl Carts {
    pub fn new(carts: Table, products: Table) -> Carts {
        Carts { carts, products }
    }

    pub async fn handle(&self, event: &Request) -> Result<Reply, ClubError> {
        let principal = http::principal(event)?;
        principal.require(&[Permission::WebshopUse])?;
        match event.method() {
            &Method::GET => self.get(&principal).await,
            &Method::PUT => self.replace(&principal, http::parse_body(event)?).await,
            &Method::DELETE => self.clear(&principal).await,
            method => Err(ClubError::bad_request(format!("unsupported route {} {}", method, event.uri().path()))),
        }
    }

    async fn get(&self, principal: &Principal) -> Result<Reply, ClubError> {
        let cart = self
            .carts
            .get::<Cart>(&principal.sub)
            .await?
            .unwrap_or_else(|| Cart::empty(&principal.sub));
        Reply::ok(&cart)
    }

    async fn replace(&self, principal: &Principal, request: UpdateCartRequest) -> Result<Reply, ClubError> {
        let mut products = HashMap::new();
        for item in &request.items {
            if !products.contains_key(&item.product_id) {
                if let Some(product) = self.products.get::<Product>(&item.product_id).await? {
                    products.insert(item.product_id.to_owned(), product);
                }
            }
        }
        let cart = Cart {
            cart_id: principal.sub.to_owned(),
            items: checked_lines(request.items, &products)?,
            updated_at: Utc::now(),
        };
        self.carts.put(&cart).await?;
        info!("cart of {} now has {} lines", principal.sub, cart.items.len());
        Reply::ok(&cart)
    }

    async fn clear(&self, principal: &Principal) -> Result<Reply, ClubError> {
        self.carts.delete::<Cart>(&principal.sub).await?;
        Ok(Reply::NoContent)
    }
}
