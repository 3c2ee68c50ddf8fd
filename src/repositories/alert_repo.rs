//! `alert_records` table access.

use std::collections::{BTreeSet, HashSet};

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use jiff::Timestamp;
use uuid::Uuid;

use crate::db::AsyncDbPool;
use crate::error::{AppError, AppResult};
use crate::models::{AlertKey, NewAlertRecord};
use crate::repositories::AlertStore;

#[derive(Clone)]
pub struct PgAlertRepository {
    pool: AsyncDbPool,
}

impl PgAlertRepository {
    pub fn new(pool: AsyncDbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AlertStore for PgAlertRepository {
    /// One round trip: `user_id = ANY(..) AND listing_id = ANY(..)` returns a
    /// superset of the requested pairs, which is narrowed in memory.
    async fn exists_bulk(&self, keys: &[AlertKey]) -> AppResult<HashSet<AlertKey>> {
        use crate::schema::alert_records::dsl::*;

        if keys.is_empty() {
            return Ok(HashSet::new());
        }

        let user_ids: Vec<Uuid> = keys
            .iter()
            .map(|k| k.user_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let listing_ids: Vec<String> = keys
            .iter()
            .map(|k| k.listing_id.as_str())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(str::to_string)
            .collect();

        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| AppError::ConnectionPool {
                source: anyhow::Error::from(e),
            })?;

        let rows = alert_records
            .filter(user_id.eq_any(user_ids))
            .filter(listing_id.eq_any(listing_ids))
            .select((user_id, listing_id))
            .load::<(Uuid, String)>(&mut conn)
            .await
            .map_err(AppError::from)?;

        let requested: HashSet<&AlertKey> = keys.iter().collect();
        Ok(rows
            .into_iter()
            .map(|(uid, lid)| AlertKey::new(uid, lid))
            .filter(|key| requested.contains(key))
            .collect())
    }

    async fn insert(&self, record: &NewAlertRecord) -> AppResult<bool> {
        use crate::schema::alert_records::dsl::*;
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| AppError::ConnectionPool {
                source: anyhow::Error::from(e),
            })?;

        let inserted = diesel::insert_into(alert_records)
            .values(record.clone())
            .on_conflict((user_id, listing_id))
            .do_nothing()
            .execute(&mut conn)
            .await
            .map_err(AppError::from)?;

        Ok(inserted == 1)
    }

    async fn count_since(&self, uid: Uuid, since: Timestamp) -> AppResult<i64> {
        use crate::schema::alert_records::dsl::*;
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| AppError::ConnectionPool {
                source: anyhow::Error::from(e),
            })?;

        alert_records
            .filter(user_id.eq(uid))
            .filter(sent_at.ge(jiff_diesel::Timestamp::from(since)))
            .count()
            .get_result::<i64>(&mut conn)
            .await
            .map_err(AppError::from)
    }
}
