use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Deserialize};
use shared::{
    domain::SupplierId,
    protocol::{Category, Product, Supplier},
};
use tracing::{debug, error};

use crate::{config::ClientSettings, error::FetchError};

const PRODUCTS_PATH: &str = "products";
const SUPPLIERS_PATH: &str = "suppliers";
const CATEGORIES_PATH: &str = "productCategories";

/// Read side of the catalog HTTP API.
#[async_trait]
pub trait CatalogApi: Send + Sync {
    async fn list_products(&self) -> Result<Vec<Product>, FetchError>;
    async fn list_categories(&self) -> Result<Vec<Category>, FetchError>;
    async fn list_suppliers(&self) -> Result<Vec<Supplier>, FetchError>;
    async fn fetch_supplier(&self, supplier_id: SupplierId) -> Result<Supplier, FetchError>;
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    message: String,
}

#[derive(Debug, Clone)]
pub struct HttpCatalogApi {
    http: Client,
    base_url: String,
    log_payloads: bool,
}

impl HttpCatalogApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into(),
            log_payloads: false,
        }
    }

    pub fn from_settings(settings: &ClientSettings) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()
            .context("failed to build catalog HTTP client")?;
        Ok(Self {
            http,
            base_url: settings.base_url.clone(),
            log_payloads: settings.log_payloads,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, FetchError> {
        let url = self.url(path);
        let response = self.http.get(&url).send().await.map_err(|err| {
            error!(%url, error = %err, "catalog request failed before a response arrived");
            FetchError::transport(err.to_string())
        })?;

        let status = response.status();
        let body = response.bytes().await.map_err(|err| {
            error!(%url, status = status.as_u16(), error = %err, "failed to read catalog response body");
            FetchError::transport(err.to_string())
        })?;

        if !status.is_success() {
            let err = FetchError::server(status.as_u16(), server_message(status, &body));
            error!(%url, status = status.as_u16(), error = %err, "catalog backend rejected request");
            return Err(err);
        }

        if self.log_payloads {
            debug!(%url, payload = %String::from_utf8_lossy(&body), "catalog payload");
        } else {
            debug!(%url, bytes = body.len(), "catalog payload received");
        }

        serde_json::from_slice(&body).map_err(|err| {
            error!(%url, error = %err, "catalog payload did not match the expected shape");
            FetchError::server(
                status.as_u16(),
                format!("Http failure during parsing for {url}: {err}"),
            )
        })
    }
}

/// Message for a non-2xx response: the envelope's `message` when the body is
/// an API error, otherwise the body text, otherwise the reason phrase.
fn server_message(status: StatusCode, body: &[u8]) -> String {
    if let Ok(envelope) = serde_json::from_slice::<ErrorEnvelope>(body) {
        return envelope.message;
    }
    let text = String::from_utf8_lossy(body).trim().to_string();
    if !text.is_empty() {
        return text;
    }
    status
        .canonical_reason()
        .unwrap_or("Unknown Error")
        .to_string()
}

#[async_trait]
impl CatalogApi for HttpCatalogApi {
    async fn list_products(&self) -> Result<Vec<Product>, FetchError> {
        self.get_json(PRODUCTS_PATH).await
    }

    async fn list_categories(&self) -> Result<Vec<Category>, FetchError> {
        self.get_json(CATEGORIES_PATH).await
    }

    async fn list_suppliers(&self) -> Result<Vec<Supplier>, FetchError> {
        self.get_json(SUPPLIERS_PATH).await
    }

    async fn fetch_supplier(&self, supplier_id: SupplierId) -> Result<Supplier, FetchError> {
        self.get_json(&format!("{SUPPLIERS_PATH}/{supplier_id}")).await
    }
}

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod tests;
