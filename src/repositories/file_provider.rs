//! Subscribers read from a JSON file, for the memory backend.

use std::path::PathBuf;

use async_trait::async_trait;
use jiff::Timestamp;

use crate::error::{AppError, AppResult};
use crate::models::Subscriber;
use crate::repositories::FilterProvider;

/// Re-reads the file on every call so edits apply from the next cycle.
///
/// The file holds a JSON array of subscribers; filters inherit the
/// subscriber's `user_id`. Entitlement is implied by presence in the file.
pub struct FileFilterProvider {
    path: PathBuf,
}

impl FileFilterProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl FilterProvider for FileFilterProvider {
    async fn list_active_subscribers(&self, _now: Timestamp) -> AppResult<Vec<Subscriber>> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| AppError::Internal {
                source: anyhow::Error::from(e)
                    .context(format!("reading subscribers file {}", self.path.display())),
            })?;

        let subscribers: Vec<Subscriber> =
            serde_json::from_str(&content).map_err(|e| AppError::Validation {
                field: "storage.subscribers_file".to_string(),
                reason: e.to_string(),
            })?;

        Ok(subscribers
            .into_iter()
            .filter(|s| !s.destination.trim().is_empty() && !s.filters.is_empty())
            .map(|mut subscriber| {
                for filter in &mut subscriber.filters {
                    filter.user_id = subscriber.user_id;
                }
                subscriber
            })
            .collect())
    }
}
