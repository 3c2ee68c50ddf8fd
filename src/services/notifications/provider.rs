//! Delivery channel abstraction.

use async_trait::async_trait;
use serde::Serialize;

use crate::error::AppResult;
use crate::models::Listing;

/// Result of one delivery attempt
#[derive(Debug, Clone, Serialize)]
pub struct DeliveryResult {
    /// Whether the channel accepted the message
    pub success: bool,
    /// HTTP status code or channel-specific status
    pub status_code: Option<u16>,
    /// Response body or error message
    pub response: Option<String>,
    /// Time taken for the attempt in milliseconds
    pub duration_ms: u64,
}

impl DeliveryResult {
    pub fn failed(response: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            success: false,
            status_code: None,
            response: Some(response.into()),
            duration_ms,
        }
    }
}

/// Pushes a batch of listings to one user destination.
///
/// Transport problems are reported through `DeliveryResult::success`; an
/// `Err` is reserved for misuse such as an unusable destination. Callers
/// treat both as a failed attempt.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn deliver(&self, destination: &str, listings: &[Listing]) -> AppResult<DeliveryResult>;

    /// Channel name for logs
    fn name(&self) -> &'static str;
}
