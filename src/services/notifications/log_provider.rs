use std::time::Instant;

use async_trait::async_trait;

use super::message::format_listings;
use super::provider::{DeliveryResult, Notifier};
use crate::error::AppResult;
use crate::models::Listing;

/// Writes the formatted message to the log instead of sending it.
///
/// Used by `--dry-run` and for local evaluation of filters.
pub struct LogNotifier {
    preview_length: usize,
}

impl LogNotifier {
    pub fn new(preview_length: usize) -> Self {
        Self { preview_length }
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn deliver(&self, destination: &str, listings: &[Listing]) -> AppResult<DeliveryResult> {
        let start = Instant::now();
        let message = format_listings(listings, self.preview_length);

        tracing::info!(
            destination,
            listings = listings.len(),
            message = %message,
            "Dry-run delivery"
        );

        Ok(DeliveryResult {
            success: true,
            status_code: None,
            response: None,
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_log_delivery_always_succeeds() {
        let notifier = LogNotifier::new(150);
        let result = notifier.deliver("12345", &[]).await.unwrap();
        assert!(result.success);
        assert_eq!(notifier.name(), "log");
    }
}
