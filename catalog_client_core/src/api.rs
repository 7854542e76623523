//! Remote catalog service client
//!
//! Thin request/response mappers over the remote REST service. The
//! [`CatalogApi`] trait is the seam the query and mutation controllers depend
//! on, so tests can substitute a mock without network access.
//!
//! Any non-2xx response is treated uniformly as failure; specific status
//! codes are not distinguished.

use crate::error::{Error, Result};
use crate::product::{DeleteAck, Product, ProductPatch};
use async_trait::async_trait;
use log::debug;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Operations exposed by the remote product service
#[async_trait]
pub trait CatalogApi: Send + Sync {
    /// Fetch the full product list
    async fn list_products(&self) -> Result<Vec<Product>>;

    /// Fetch a single product by id
    async fn get_product(&self, id: u64) -> Result<Product>;

    /// Update a product; the response carries the confirmed server state
    async fn update_product(&self, id: u64, patch: &ProductPatch) -> Result<Product>;

    /// Delete a product
    async fn delete_product(&self, id: u64) -> Result<DeleteAck>;

    /// Fetch the category names
    async fn list_categories(&self) -> Result<Vec<String>>;
}

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL of the remote product service
    pub base_url: String,
    /// Transport-level request timeout
    pub timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://fakestoreapi.com".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// `CatalogApi` implementation over HTTP/JSON
pub struct HttpCatalogApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpCatalogApi {
    /// Create a client for the given service configuration
    pub fn new(config: ApiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Map a response to JSON, folding non-2xx statuses into `Error::Network`
    async fn decode<T: DeserializeOwned>(response: reqwest::Response, path: &str) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            return Err(Error::http_status(status.as_u16(), path));
        }
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl CatalogApi for HttpCatalogApi {
    async fn list_products(&self) -> Result<Vec<Product>> {
        let path = "/products";
        debug!("GET {path}");
        let response = self.client.get(self.url(path)).send().await?;
        Self::decode(response, path).await
    }

    async fn get_product(&self, id: u64) -> Result<Product> {
        let path = format!("/products/{id}");
        debug!("GET {path}");
        let response = self.client.get(self.url(&path)).send().await?;
        Self::decode(response, &path).await
    }

    async fn update_product(&self, id: u64, patch: &ProductPatch) -> Result<Product> {
        let path = format!("/products/{id}");
        debug!("PUT {path}");
        let response = self
            .client
            .put(self.url(&path))
            .json(patch)
            .send()
            .await?;
        Self::decode(response, &path).await
    }

    async fn delete_product(&self, id: u64) -> Result<DeleteAck> {
        let path = format!("/products/{id}");
        debug!("DELETE {path}");
        let response = self.client.delete(self.url(&path)).send().await?;
        Self::decode(response, &path).await
    }

    async fn list_categories(&self) -> Result<Vec<String>> {
        let path = "/products/categories";
        debug!("GET {path}");
        let response = self.client.get(self.url(path)).send().await?;
        Self::decode(response, path).await
    }
}
