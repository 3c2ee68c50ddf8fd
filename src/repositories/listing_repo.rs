//! `listings` table access.

use async_trait::async_trait;
use diesel::dsl::exists;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use jiff::Timestamp;

use crate::db::AsyncDbPool;
use crate::error::{AppError, AppResult};
use crate::models::Listing;
use crate::repositories::JobStore;

#[derive(Clone)]
pub struct PgListingRepository {
    pool: AsyncDbPool,
}

impl PgListingRepository {
    pub fn new(pool: AsyncDbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobStore for PgListingRepository {
    async fn exists_by_id(&self, listing_id: &str) -> AppResult<bool> {
        use crate::schema::listings::dsl::*;
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| AppError::ConnectionPool {
                source: anyhow::Error::from(e),
            })?;

        diesel::select(exists(listings.filter(id.eq(listing_id))))
            .get_result::<bool>(&mut conn)
            .await
            .map_err(AppError::from)
    }

    /// `ON CONFLICT DO NOTHING` keeps concurrent cycles from failing on the
    /// primary key; zero affected rows reports the listing as already present.
    async fn insert(&self, listing: &Listing) -> AppResult<bool> {
        use crate::schema::listings::dsl::*;
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| AppError::ConnectionPool {
                source: anyhow::Error::from(e),
            })?;

        let inserted = diesel::insert_into(listings)
            .values(listing.clone())
            .on_conflict(id)
            .do_nothing()
            .execute(&mut conn)
            .await
            .map_err(AppError::from)?;

        Ok(inserted == 1)
    }

    async fn query_recent(&self, since: Timestamp) -> AppResult<Vec<Listing>> {
        use crate::schema::listings::dsl::*;
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| AppError::ConnectionPool {
                source: anyhow::Error::from(e),
            })?;

        listings
            .filter(published_at.ge(jiff_diesel::Timestamp::from(since)))
            .order(published_at.asc())
            .select(Listing::as_select())
            .load(&mut conn)
            .await
            .map_err(AppError::from)
    }
}
