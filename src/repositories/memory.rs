//! In-process store for local runs and tests.

use std::collections::HashSet;

use async_trait::async_trait;
use jiff::Timestamp;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{AlertKey, Listing, NewAlertRecord};
use crate::repositories::{AlertStore, JobStore};

/// `JobStore` and `AlertStore` backed by `DashMap`s.
///
/// Inserts go through the entry API, so the uniqueness of listing ids and
/// (user, listing) pairs holds under concurrent callers just like the
/// database constraints.
#[derive(Default)]
pub struct MemoryStore {
    listings: DashMap<String, Listing>,
    alerts: DashMap<AlertKey, NewAlertRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn listing_count(&self) -> usize {
        self.listings.len()
    }

    /// Snapshot of every alert record, ordered by key.
    pub fn alert_records(&self) -> Vec<NewAlertRecord> {
        let mut records: Vec<NewAlertRecord> =
            self.alerts.iter().map(|entry| entry.value().clone()).collect();
        records.sort_by(|a, b| a.key().cmp(&b.key()));
        records
    }
}

#[async_trait]
impl JobStore for MemoryStore {
    async fn exists_by_id(&self, id: &str) -> AppResult<bool> {
        Ok(self.listings.contains_key(id))
    }

    async fn insert(&self, listing: &Listing) -> AppResult<bool> {
        match self.listings.entry(listing.id.clone()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(listing.clone());
                Ok(true)
            }
        }
    }

    async fn query_recent(&self, since: Timestamp) -> AppResult<Vec<Listing>> {
        let mut recent: Vec<Listing> = self
            .listings
            .iter()
            .filter(|entry| entry.published_at >= since)
            .map(|entry| entry.value().clone())
            .collect();
        recent.sort_by(|a, b| a.published_at.cmp(&b.published_at).then(a.id.cmp(&b.id)));
        Ok(recent)
    }
}

#[async_trait]
impl AlertStore for MemoryStore {
    async fn exists_bulk(&self, keys: &[AlertKey]) -> AppResult<HashSet<AlertKey>> {
        Ok(keys
            .iter()
            .filter(|key| self.alerts.contains_key(*key))
            .cloned()
            .collect())
    }

    async fn insert(&self, record: &NewAlertRecord) -> AppResult<bool> {
        match self.alerts.entry(record.key()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(record.clone());
                Ok(true)
            }
        }
    }

    async fn count_since(&self, user_id: Uuid, since: Timestamp) -> AppResult<i64> {
        Ok(self
            .alerts
            .iter()
            .filter(|entry| entry.user_id == user_id && entry.sent_at >= since)
            .count() as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::JobType;
    use bigdecimal::BigDecimal;
    use jiff::SignedDuration;

    fn listing(id: &str, published_at: Timestamp) -> Listing {
        Listing {
            id: id.to_string(),
            title: format!("Listing {}", id),
            url: format!("https://www.upwork.com/jobs/~{}", id),
            category: "design".to_string(),
            job_type: JobType::Fixed,
            description: String::new(),
            skills: Vec::new(),
            budget: BigDecimal::from(100),
            client_location: None,
            client_spend: None,
            client_rating: None,
            published_at,
            ingested_at: published_at,
        }
    }

    #[tokio::test]
    async fn test_listing_insert_is_idempotent() {
        let store = MemoryStore::new();
        let now = "2025-03-01T12:00:00Z".parse::<Timestamp>().unwrap();

        assert!(JobStore::insert(&store, &listing("01a", now)).await.unwrap());
        assert!(!JobStore::insert(&store, &listing("01a", now)).await.unwrap());
        assert!(store.exists_by_id("01a").await.unwrap());
        assert_eq!(store.listing_count(), 1);
    }

    #[tokio::test]
    async fn test_query_recent_orders_by_publish_time() {
        let store = MemoryStore::new();
        let now = "2025-03-01T12:00:00Z".parse::<Timestamp>().unwrap();

        JobStore::insert(&store, &listing("new", now)).await.unwrap();
        JobStore::insert(&store, &listing("old", now - SignedDuration::from_hours(2))).await.unwrap();
        JobStore::insert(&store, &listing("mid", now - SignedDuration::from_mins(5))).await.unwrap();

        let recent = store.query_recent(now - SignedDuration::from_mins(10)).await.unwrap();
        let ids: Vec<&str> = recent.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, vec!["mid", "new"]);
    }

    #[tokio::test]
    async fn test_alert_uniqueness_and_counts() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        let now = "2025-03-01T12:00:00Z".parse::<Timestamp>().unwrap();

        let record = |listing_id: &str, sent_at| NewAlertRecord {
            user_id: user,
            listing_id: listing_id.to_string(),
            sent_at,
            delivered: true,
        };

        assert!(AlertStore::insert(&store, &record("a", now)).await.unwrap());
        assert!(!AlertStore::insert(&store, &record("a", now)).await.unwrap());
        assert!(AlertStore::insert(&store, &record("b", now - SignedDuration::from_hours(3))).await.unwrap());

        assert_eq!(store.count_since(user, now - SignedDuration::from_hours(1)).await.unwrap(), 1);

        let existing = store
            .exists_bulk(&[AlertKey::new(user, "a"), AlertKey::new(user, "c")])
            .await
            .unwrap();
        assert_eq!(existing, HashSet::from([AlertKey::new(user, "a")]));
    }
}
