//! Storage seams consumed by the pipeline.

use std::collections::HashSet;

use async_trait::async_trait;
use jiff::Timestamp;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{AlertKey, Listing, NewAlertRecord, Subscriber};

/// Listings keyed by their external id.
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn exists_by_id(&self, id: &str) -> AppResult<bool>;

    /// Insert-if-absent. `Ok(false)` means the id already existed.
    async fn insert(&self, listing: &Listing) -> AppResult<bool>;

    /// Listings published at or after `since`, oldest first.
    async fn query_recent(&self, since: Timestamp) -> AppResult<Vec<Listing>>;
}

/// Delivery records, unique per (user, listing).
#[async_trait]
pub trait AlertStore: Send + Sync {
    /// Subset of `keys` that already has a record.
    async fn exists_bulk(&self, keys: &[AlertKey]) -> AppResult<HashSet<AlertKey>>;

    /// Insert-if-absent. `Ok(false)` means the pair was already recorded.
    async fn insert(&self, record: &NewAlertRecord) -> AppResult<bool>;

    async fn count_since(&self, user_id: Uuid, since: Timestamp) -> AppResult<i64>;
}

/// Source of entitled users and their filters.
#[async_trait]
pub trait FilterProvider: Send + Sync {
    /// Users with an active entitlement, a destination and at least one filter.
    async fn list_active_subscribers(&self, now: Timestamp) -> AppResult<Vec<Subscriber>>;
}
