//! Apify dataset source for Upwork listings.

mod types;

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::config::ApifyConfig;
use crate::error::{AppError, AppResult};
use crate::external::client::build_http_client;
use crate::external::source::JobSource;
use crate::models::RawListing;
use types::ApifyItem;

/// Runs the configured Apify task synchronously and maps its dataset items.
pub struct ApifySource {
    client: reqwest::Client,
    endpoint: String,
    token: String,
}

impl ApifySource {
    pub fn new(config: &ApifyConfig) -> AppResult<Self> {
        let timeout = Duration::from_secs(config.timeout_seconds);
        Ok(Self::with_client(
            build_http_client(timeout, Duration::from_secs(10))?,
            config,
        ))
    }

    pub fn with_client(client: reqwest::Client, config: &ApifyConfig) -> Self {
        Self {
            client,
            endpoint: config.endpoint.clone(),
            token: config.token.clone(),
        }
    }

    fn make_error(message: impl Into<String>) -> AppError {
        AppError::SourceUnavailable {
            message: message.into(),
        }
    }

    async fn fetch_items(&self) -> AppResult<Vec<RawListing>> {
        // The token is a query parameter; keep the full URL out of logs
        let url = reqwest::Url::parse_with_params(&self.endpoint, &[("token", &self.token)])
            .map_err(|e| Self::make_error(format!("invalid endpoint: {}", e)))?;

        let items: Vec<Value> = self
            .client
            .post(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| Self::make_error(format!("request failed: {}", e.without_url())))?
            .error_for_status()
            .map_err(|e| Self::make_error(format!("HTTP error: {}", e.without_url())))?
            .json()
            .await
            .map_err(|e| Self::make_error(format!("invalid JSON: {}", e.without_url())))?;

        Ok(decode_items(items))
    }
}

/// Decodes items one by one so a single odd record does not drop the batch.
fn decode_items(items: Vec<Value>) -> Vec<RawListing> {
    items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| match serde_json::from_value::<ApifyItem>(item) {
            Ok(item) => Some(RawListing::from(item)),
            Err(e) => {
                tracing::warn!(index, error = %e, "Skipping undecodable Apify item");
                None
            }
        })
        .collect()
}

#[async_trait]
impl JobSource for ApifySource {
    async fn fetch(&self) -> Vec<RawListing> {
        tracing::info!("Fetching listings from Apify");
        match self.fetch_items().await {
            Ok(listings) => {
                tracing::info!(fetched = listings.len(), "Fetched listings from Apify");
                listings
            }
            Err(e) => {
                tracing::error!(error = %e, "Apify fetch failed, treating as empty batch");
                Vec::new()
            }
        }
    }

    fn name(&self) -> &'static str {
        "apify"
    }
}
