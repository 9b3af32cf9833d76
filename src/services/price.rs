use crate::{error::PaystrataError, services::CacheService};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

const PRICE_CACHE_KEY: &str = "price:starknet:ngn";

/// Looks up the settlement token's price in naira.
pub struct PriceService {
    client: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
    cache: Arc<CacheService>,
    ttl_secs: u64,
}

impl PriceService {
    pub fn new(
        api_url: &str,
        api_key: Option<String>,
        cache: Arc<CacheService>,
        ttl_secs: u64,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key,
            cache,
            ttl_secs,
        })
    }

    pub async fn stark_price(&self) -> Result<Value, PaystrataError> {
        if let Some(cached) = self.cache.get::<Value>(PRICE_CACHE_KEY).await.ok().flatten() {
            tracing::debug!("Returning cached token price");
            return Ok(cached);
        }

        let mut request = self
            .client
            .get(format!("{}/simple/price", self.api_url))
            .query(&[("vs_currencies", "ngn"), ("ids", "starknet")]);
        if let Some(key) = &self.api_key {
            request = request.header("x-cg-demo-api-key", key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| PaystrataError::Upstream(e.to_string()))?;
        if !response.status().is_success() {
            return Err(PaystrataError::Upstream(format!(
                "Price API responded with status {}",
                response.status()
            )));
        }

        let data: Value = response
            .json()
            .await
            .map_err(|e| PaystrataError::Upstream(format!("Invalid price response: {}", e)))?;

        if data.is_null() || data.as_object().is_some_and(|o| o.is_empty()) {
            return Err(PaystrataError::NotFound(
                "An error occured please try again".to_string(),
            ));
        }

        if let Err(e) = self.cache.set(PRICE_CACHE_KEY, &data, self.ttl_secs).await {
            tracing::warn!("Failed to cache token price: {}", e);
        }

        tracing::info!(price = %data, "Token price refreshed");
        Ok(data)
    }
}
