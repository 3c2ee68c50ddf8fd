//! Telegram Bot API notifier.
//!
//! Sends one `sendMessage` call per batch with HTML parse mode and link
//! previews disabled. The bot token is part of the URL path, so transport
//! errors are reported without their URL.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use super::message::format_listings;
use super::provider::{DeliveryResult, Notifier};
use crate::config::TelegramConfig;
use crate::error::{AppError, AppResult};
use crate::external::build_http_client;
use crate::models::Listing;

#[derive(Debug, Deserialize)]
struct TelegramResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

pub struct TelegramNotifier {
    client: reqwest::Client,
    api_base: String,
    bot_token: String,
    preview_length: usize,
}

impl TelegramNotifier {
    pub fn new(config: &TelegramConfig) -> AppResult<Self> {
        let timeout = Duration::from_secs(config.timeout_seconds);
        Ok(Self::with_client(build_http_client(timeout, timeout)?, config))
    }

    pub fn with_client(client: reqwest::Client, config: &TelegramConfig) -> Self {
        Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            bot_token: config.bot_token.clone(),
            preview_length: config.preview_length,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_base, self.bot_token)
    }

    fn build_request_body(&self, chat_id: &str, listings: &[Listing]) -> serde_json::Value {
        json!({
            "chat_id": chat_id,
            "text": format_listings(listings, self.preview_length),
            "parse_mode": "HTML",
            "disable_web_page_preview": true,
        })
    }
}

/// 2xx alone is not enough; the API can answer 200 with `ok: false`.
fn accepted(status: reqwest::StatusCode, body: &str) -> bool {
    if !status.is_success() {
        return false;
    }

    match serde_json::from_str::<TelegramResponse>(body) {
        Ok(response) => {
            if !response.ok {
                tracing::warn!(
                    description = response.description.as_deref().unwrap_or_default(),
                    "Telegram rejected message"
                );
            }
            response.ok
        }
        Err(_) => true,
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn deliver(&self, destination: &str, listings: &[Listing]) -> AppResult<DeliveryResult> {
        if destination.trim().is_empty() {
            return Err(AppError::Delivery {
                channel: self.name().to_string(),
                message: "empty chat id".to_string(),
            });
        }

        let start = Instant::now();
        let body = self.build_request_body(destination.trim(), listings);

        let response = self.client.post(self.endpoint()).json(&body).send().await;
        let duration_ms = start.elapsed().as_millis() as u64;

        match response {
            Ok(resp) => {
                let status = resp.status();
                let text = resp.text().await.unwrap_or_default();

                Ok(DeliveryResult {
                    success: accepted(status, &text),
                    status_code: Some(status.as_u16()),
                    response: Some(text),
                    duration_ms,
                })
            }
            Err(e) => Ok(DeliveryResult::failed(
                e.without_url().to_string(),
                duration_ms,
            )),
        }
    }

    fn name(&self) -> &'static str {
        "telegram"
    }
}
