use chrono::Utc;
use club_common::http::{self, Reply};
use club_common::model::Product;
use club_common::store::Table;
use club_common::{ClubError, Permission, Principal};
use lambda_http::http::Method;
use lambda_http::Request;
use serde::Deserialize;
use tracing::info;

pub const PRODUCTS_TABLE: &str = "PRODUCTS_TABLE";

#[derive(Debug, Clone, Deserialize)]
pub struct ProductRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price_cents: u64,
    #[serde(default)]
    pub sizes: Vec<String>,
    #[serde(default)]
    pub stock: Option<u32>,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub image_url: Option<String>,
}

fn default_active() -> bool {
    true
}

impl ProductRequest {
    pub fn into_product(self, product_id: String) -> Result<Product, ClubError> {
        let mut sizes: Vec<String> = Vec::with_capacity(self.sizes.len());
        for size in self.sizes.iter().map(|s| s.trim().to_uppercase()).filter(|s| !s.is_empty()) {
            if !sizes.contains(&size) {
                sizes.push(size);
            }
        }
        let product = Product {
            product_id,
            name: self.name.trim().to_string(),
            description: self.description,
            price_cents: self.price_cents,
            sizes,
            stock: self.stock,
            active: self.active,
            image_url: self.image_url,
            updated_at: Utc::now(),
        };
        product.validate()?;
        Ok(product)
    }
}

/// Shop visitors only see what is for sale; managers see the whole catalogue.
pub fn catalogue(products: Vec<Product>, include_inactive: bool) -> Vec<Product> {
    let mut listed: Vec<Product> = products
        .into_iter()
        .filter(|p| include_inactive || p.active)
        .collect();
    listed.sort_by(|a, b| a.name.cmp(&b.name));
    listed
}

pub struct Products {
    table: Table,
}

impl Products {
    pub fn new(table: Table) -> Products {
        Products { table }
    }

    pub async fn handle(&self, event: &Request) -> Result<Reply, ClubError> {
        let principal = http::principal(event)?;
        let id = http::path_param(event, "id");
        match (event.method(), id.as_deref()) {
            (&Method::GET, None) => self.list(&principal).await,
            (&Method::GET, Some(id)) => self.get(&principal, id).await,
            (&Method::POST, None) => self.create(&principal, http::parse_body(event)?).await,
            (&Method::PUT, Some(id)) => self.update(&principal, id, http::parse_body(event)?).await,
            (&Method::DELETE, Some(id)) => self.delete(&principal, id).await,
            (method, _) => Err(ClubError::bad_request(format!("unsupported route {} {}", method, event.uri().path()))),
        }
    }

    async fn list(&self, principal: &Principal) -> Result<Reply, ClubError> {
        principal.require(&[Permission::ProductsRead])?;
        let products = self.table.scan::<Product>().await?;
        Reply::ok(&catalogue(products, principal.has(Permission::ProductsManage)))
    }

    async fn get(&self, principal: &Principal, id: &str) -> Result<Reply, ClubError> {
        principal.require(&[Permission::ProductsRead])?;
        let product: Product = self.table.fetch(id).await?;
        if !product.active && !principal.has(Permission::ProductsManage) {
            return Err(ClubError::not_found(format!("product {}", id)));
        }
        Reply::ok(&product)
    }

    async fn create(&self, principal: &Principal, request: ProductRequest) -> Result<Reply, ClubError> {
        principal.require(&[Permission::ProductsManage])?;
        let product = request.into_product(uuid::Uuid::new_v4().to_string())?;
        self.table.put(&product).await?;
        info!("{} created product {}", principal.sub, product.product_id);
        Reply::created(&product)
    }

    async fn update(&self, principal: &Principal, id: &str, request: ProductRequest) -> Result<Reply, ClubError> {
        principal.require(&[Permission::ProductsManage])?;
        self.table.fetch::<Product>(id).await?;
        let product = request.into_product(id.to_string())?;
        self.table.put(&product).await?;
        info!("{} updated product {}", principal.sub, id);
        Reply::ok(&product)
    }

    async fn delete(&self, principal: &Principal, id: &str) -> Result<Reply, ClubError> {
        principal.require(&[Permission::ProductsManage])?;
        if !self.table.delete::<Product>(id).await? {
            return Err(ClubError::not_found(format!("product {}", id)));
        }
        info!("{} deleted product {}", principal.sub, id);
        Ok(Reply::NoContent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(json: serde_json::Value) -> ProductRequest {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn sizes_are_cleaned() {
        let product = request(serde_json::json!({
            "name": " Hoodie ",
            "price_cents": 4500,
            "sizes": ["m", "L", " M ", ""]
        }))
        .into_product("p-1".to_string())
        .unwrap();
        assert_eq!(product.name, "Hoodie");
        assert_eq!(product.sizes, vec!["M", "L"]);
        assert!(product.active);
    }

    #[test]
    fn free_products_are_refused() {
        let result = request(serde_json::json!({"name": "Sticker", "price_cents": 0})).into_product("p".to_string());
        assert!(matches!(result, Err(ClubError::BadRequest(_))));
    }

    #[test]
    fn catalogue_hides_inactive_for_visitors() {
        let make = |name: &str, active: bool| {
            request(serde_json::json!({"name": name, "price_cents": 100, "active": active}))
                .into_product(name.to_string())
                .unwrap()
        };
        let products = vec![make("Pin", true), make("Cap", false), make("Badge", true)];
        let names = |list: Vec<Product>| list.into_iter().map(|p| p.name).collect::<Vec<_>>();
        assert_eq!(names(catalogue(products.clone(), false)), vec!["Badge", "Pin"]);
        assert_eq!(names(catalogue(products, true)), vec!["Badge", "Cap", "Pin"]);
    }
}
