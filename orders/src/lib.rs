use std::collections::HashMap;

use club_common::http::{self, Reply};
use club_common::model::{Cart, Order, OrderLine, OrderStatus, Product};
use club_common::store::{self, Table};
use club_common::{AccessError, ClubError, Permission, Principal};
use lambda_http::http::Method;
use lambda_http::Request;
use serde::Deserialize;
use tracing::info;

pub const ORDERS_TABLE: &str = "ORDERS_TABLE";
pub const CARTS_TABLE: &str = "CARTS_TABLE";
pub const PRODUCTS_TABLE: &str = "PRODUCTS_TABLE";

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: OrderStatus,
}

/// Prices the cart with the current catalogue.
pub fn order_lines(cart: &Cart, products: &HashMap<String, Product>) -> Result<Vec<OrderLine>, ClubError> {
    if cart.items.is_empty() {
        return Err(ClubError::bad_request("the cart is empty"));
    }
    cart.items
        .iter()
        .map(|item| {
            let product = products
                .get(&item.product_id)
                .ok_or_else(|| ClubError::Conflict(format!("product {} is no longer available", item.product_id)))?;
            product.accepts(item.size.as_deref(), item.quantity)?;
            Ok(OrderLine {
                product_id: product.product_id.to_owned(),
                name: product.name.to_owned(),
                size: item.size.to_owned(),
                quantity: item.quantity,
                unit_price_cents: product.price_cents,
            })
        })
        .collect()
}

/// Stock left per stock-managed product once `lines` are taken out.
pub fn remaining_stock(lines: &[OrderLine], products: &HashMap<String, Product>) -> Result<Vec<(String, u32)>, ClubError> {
    let mut wanted: HashMap<&str, u32> = HashMap::new();
    for line in lines {
        let total = wanted.entry(line.product_id.as_str()).or_insert(0);
        *total = total
            .checked_add(line.quantity)
            .ok_or_else(|| ClubError::Conflict(format!("not enough stock for {}", line.product_id)))?;
    }
    let mut remaining = Vec::new();
    for (product_id, quantity) in wanted {
        if let Some(stock) = products.get(product_id).and_then(|p| p.stock) {
            let left = stock
                .checked_sub(quantity)
                .ok_or_else(|| ClubError::Conflict(format!("not enough stock for {}", product_id)))?;
            remaining.push((product_id.to_string(), left));
        }
    }
    remaining.sort();
    Ok(remaining)
}

pub fn check_owner_or(principal: &Principal, order: &Order, permission: Permission) -> Result<(), ClubError> {
    if order.member_sub == principal.sub {
        return Ok(());
    }
    if principal.has(permission) {
        return Ok(());
    }
    Err(AccessError::NotOwner.into())
}

#[derive(Debug, PartialEq, Eq)]
pub enum Route {
    Checkout,
    List,
    Get(String),
    SetStatus(String),
}

impl Route {
    pub fn from_request(event: &Request) -> Result<Route, ClubError> {
        let id = http::path_param(event, "id");
        let status_route = event.uri().path().trim_end_matches('/').ends_with("/status");
        match (event.method(), id) {
            (&Method::POST, None) => Ok(Route::Checkout),
            (&Method::GET, None) => Ok(Route::List),
            (&Method::GET, Some(id)) if !status_route => Ok(Route::Get(id)),
            (&Method::PUT, Some(id)) if status_route => Ok(Route::SetStatus(id)),
            (method, _) => Err(ClubError::bad_request(format!("unsupported route {} {}", method, event.uri().path()))),
        }
    }
}

pub struct Orders {
    orders: Table,
    carts: Table,
    products: Table,
}

impl Orders {
    pub fn new(orders: Table, carts: Table, products: Table) -> Orders {
        Orders { orders, carts, products }
    }

    pub async fn handle(&self, event: &Request) -> Result<Reply, ClubError> {
        let principal = http::principal(event)?;
        match Route::from_request(event)? {
            Route::Checkout => self.checkout(&principal).await,
            Route::List => self.list(&principal).await,
            Route::Get(id) => self.get(&principal, &id).await,
            Route::SetStatus(id) => {
                let request: StatusRequest = http::parse_body(event)?;
                self.set_status(&principal, &id, request.status).await
            }
        }
    }

    async fn checkout(&self, principal: &Principal) -> Result<Reply, ClubError> {
        principal.require(&[Permission::WebshopUse])?;
        let cart = self
            .carts
            .get::<Cart>(&principal.sub)
            .await?
            .unwrap_or_else(|| Cart::empty(&principal.sub));
        let mut products = HashMap::new();
        for item in &cart.items {
            if let Some(product) = self.products.get::<Product>(&item.product_id).await? {
                products.insert(item.product_id.to_owned(), product);
            }
        }
        let lines = order_lines(&cart, &products)?;
        let stock = remaining_stock(&lines, &products)?;
        let order = Order::new(uuid::Uuid::new_v4().to_string(), &principal.sub, principal.email.to_owned(), lines)?;

        for (product_id, left) in stock {
            self.products
                .set_attributes::<Product>(&product_id, vec![("stock", store::n(left))])
                .await?;
        }
        self.orders.put(&order).await?;
        self.carts.delete::<Cart>(&principal.sub).await?;
        info!("{} placed order {} for {} cents", principal.sub, order.order_id, order.total_cents);
        Reply::created(&order)
    }

    async fn list(&self, principal: &Principal) -> Result<Reply, ClubError> {
        let all = principal.has(Permission::OrdersRead);
        if !all {
            principal.require(&[Permission::WebshopUse])?;
        }
        let mut orders: Vec<Order> = self
            .orders
            .scan::<Order>()
            .await?
            .into_iter()
            .filter(|o| all || o.member_sub == principal.sub)
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Reply::ok(&orders)
    }

    async fn get(&self, principal: &Principal, id: &str) -> Result<Reply, ClubError> {
        let order: Order = self.orders.fetch(id).await?;
        check_owner_or(principal, &order, Permission::OrdersRead)?;
        Reply::ok(&order)
    }

    async fn set_status(&self, principal: &Principal, id: &str, status: OrderStatus) -> Result<Reply, ClubError> {
        principal.require(&[Permission::OrdersManage])?;
        let mut order: Order = self.orders.fetch(id).await?;
        order.transition(status)?;
        self.orders
            .set_attributes::<Order>(id, vec![
                ("status", store::enum_value(&order.status)),
                ("updated_at", store::timestamp(order.updated_at)),
            ])
            .await?;
        info!("{} moved order {} to {:?}", principal.sub, id, status);
        Reply::ok(&order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use club_common::model::CartItem;
    use lambda_http::{Body, RequestExt};

    fn product(id: &str, price_cents: u64, stock: Option<u32>) -> Product {
        Product {
            product_id: id.to_string(),
            name: format!("Product {}", id),
            description: None,
            price_cents,
            sizes: vec![],
            stock,
            active: true,
            image_url: None,
            updated_at: Utc::now(),
        }
    }

    fn cart(items: &[(&str, u32)]) -> Cart {
        Cart {
            items: items
                .iter()
                .map(|(id, quantity)| CartItem { product_id: id.to_string(), size: None, quantity: *quantity })
                .collect(),
            ..Cart::empty("sub-buyer")
        }
    }

    fn catalogue() -> HashMap<String, Product> {
        HashMap::from([
            ("a".to_string(), product("a", 1000, Some(4))),
            ("b".to_string(), product("b", 250, None)),
        ])
    }

    #[test]
    fn lines_use_current_prices() {
        let lines = order_lines(&cart(&[("a", 2), ("b", 3)]), &catalogue()).unwrap();
        let order = Order::new("o".to_string(), "sub-buyer", None, lines).unwrap();
        assert_eq!(order.total_cents, 2750);
        assert_eq!(order.status, OrderStatus::Pending);
    }

    #[test]
    fn empty_or_stale_carts_fail() {
        assert!(matches!(order_lines(&cart(&[]), &catalogue()), Err(ClubError::BadRequest(_))));
        assert!(matches!(order_lines(&cart(&[("gone", 1)]), &catalogue()), Err(ClubError::Conflict(_))));
    }

    #[test]
    fn stock_is_only_tracked_for_managed_products() {
        let lines = order_lines(&cart(&[("a", 3), ("b", 10)]), &catalogue()).unwrap();
        assert_eq!(remaining_stock(&lines, &catalogue()).unwrap(), vec![("a".to_string(), 1)]);
    }

    #[test]
    fn summed_quantities_cannot_wrap_past_stock() {
        let line = |size: &str, quantity: u32| OrderLine {
            product_id: "a".to_string(),
            name: "Product a".to_string(),
            size: Some(size.to_string()),
            quantity,
            unit_price_cents: 1000,
        };
        let lines = vec![line("M", u32::MAX), line("L", 6)];
        assert!(matches!(remaining_stock(&lines, &catalogue()), Err(ClubError::Conflict(_))));
    }

    #[test]
    fn owners_and_staff_see_orders() {
        let order = Order::new("o".to_string(), "sub-buyer", None, vec![]).unwrap();
        let buyer = Principal { sub: "sub-buyer".to_string(), email: None, groups: vec!["Club_Members".to_string()] };
        let stranger = Principal { sub: "sub-x".to_string(), ..buyer.clone() };
        let treasurer = Principal { sub: "sub-t".to_string(), email: None, groups: vec!["Finance".to_string()] };
        assert!(check_owner_or(&buyer, &order, Permission::OrdersRead).is_ok());
        assert!(check_owner_or(&stranger, &order, Permission::OrdersRead).is_err());
        assert!(check_owner_or(&treasurer, &order, Permission::OrdersRead).is_ok());
    }

    fn route(method: Method, path: &str, id: Option<&str>) -> Result<Route, ClubError> {
        let event = lambda_http::http::Request::builder()
            .method(method)
            .uri(path)
            .body(Body::Empty)
            .unwrap();
        let event = match id {
            Some(id) => event.with_path_parameters(HashMap::from([("id".to_string(), id.to_string())])),
            None => event,
        };
        Route::from_request(&event)
    }

    #[test]
    fn routes() {
        assert_eq!(route(Method::POST, "/orders", None).unwrap(), Route::Checkout);
        assert_eq!(route(Method::GET, "/orders", None).unwrap(), Route::List);
        assert_eq!(route(Method::GET, "/orders/o-1", Some("o-1")).unwrap(), Route::Get("o-1".to_string()));
        assert_eq!(route(Method::PUT, "/orders/o-1/status", Some("o-1")).unwrap(), Route::SetStatus("o-1".to_string()));
        assert!(matches!(route(Method::PUT, "/orders/o-1", Some("o-1")), Err(ClubError::BadRequest(_))));
        assert!(matches!(route(Method::GET, "/orders/o-1/status", Some("o-1")), Err(ClubError::BadRequest(_))));
        assert!(matches!(route(Method::DELETE, "/orders/o-1", Some("o-1")), Err(ClubError::BadRequest(_))));
    }
}
