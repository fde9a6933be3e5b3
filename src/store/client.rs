use super::{ProductStore, StoreError};
use crate::config::StoreConfig;
use crate::import::record::{CreatedProduct, ProductRecord};
use log::debug;
use reqwest::Client;
use std::time::Duration;
use tokio::time::timeout;

/// JSON-over-HTTP client for the catalog service's product endpoint.
#[derive(Debug, Clone)]
pub struct HttpProductStore {
    http: Client,
    config: StoreConfig,
    endpoint: String,
}

impl HttpProductStore {
    pub fn new(config: StoreConfig) -> Result<Self, StoreError> {
        let http = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent("catalog-import/0.1")
            .build()
            .map_err(StoreError::Http)?;

        let endpoint = format!("{}/products", config.base_url.trim_end_matches('/'));

        Ok(Self {
            http,
            config,
            endpoint,
        })
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn dispatch_create(&self, record: &ProductRecord) -> Result<CreatedProduct, StoreError> {
        let mut request = self.http.post(&self.endpoint).json(record);
        if let Some(token) = &self.config.api_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(StoreError::Http)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "failed to read error body".to_string());
            return Err(StoreError::status(status, body));
        }

        let body = response.bytes().await.map_err(StoreError::Http)?;
        let created: CreatedProduct = serde_json::from_slice(&body)?;
        Ok(created)
    }
}

#[rocket::async_trait]
impl ProductStore for HttpProductStore {
    async fn create_product(&self, record: &ProductRecord) -> Result<CreatedProduct, StoreError> {
        debug!("catalog: creating product {}", record.primary_sku);

        match timeout(self.config.request_timeout, self.dispatch_create(record)).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout(self.config.request_timeout)),
        }
    }
}
