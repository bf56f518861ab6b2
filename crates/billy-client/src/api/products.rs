use crate::envelope;
use crate::error::BillyError;
use crate::models::{NewProduct, Product, ProductUpdate};
use crate::request::ApiRequest;
use crate::BillyClient;
use serde_json::json;

impl BillyClient {
    pub async fn list_products(&self) -> Result<Vec<Product>, BillyError> {
        let endpoint = "/products";
        let response = self.send(ApiRequest::get(endpoint)).await?;
        Ok(envelope::list(endpoint, &response.body, "products"))
    }

    pub async fn get_product(&self, id: &str) -> Result<Product, BillyError> {
        let endpoint = format!("/products/{}", urlencoding::encode(id));
        let response = self.send(ApiRequest::get(&endpoint)).await?;
        envelope::entity(&endpoint, &response.body, "product", "products")
    }

    pub async fn create_product(&self, product: &NewProduct) -> Result<Product, BillyError> {
        if product.name.trim().is_empty() {
            return Err(BillyError::InvalidInput("a product needs a name".to_string()));
        }

        let endpoint = "/products";
        let response = self
            .send(ApiRequest::post(endpoint, json!({ "product": product })))
            .await?;
        envelope::entity(endpoint, &response.body, "product", "products")
    }

    pub async fn update_product(&self, id: &str, update: &ProductUpdate) -> Result<Product, BillyError> {
        if update == &ProductUpdate::default() {
            return Err(BillyError::InvalidInput("product update has no fields".to_string()));
        }

        let endpoint = format!("/products/{}", urlencoding::encode(id));
        let response = self
            .send(ApiRequest::put(&endpoint, json!({ "product": update })))
            .await?;
        envelope::entity(&endpoint, &response.body, "product", "products")
    }
}
