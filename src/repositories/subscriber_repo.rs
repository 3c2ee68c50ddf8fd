//! Entitled subscribers and their filters from the account tables.

use std::collections::HashMap;

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use jiff::Timestamp;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use crate::db::AsyncDbPool;
use crate::error::{AppError, AppResult};
use crate::models::{Filter, Subscriber};
use crate::repositories::FilterProvider;

type FilterRow = (Uuid, Uuid, Option<String>, Option<BigDecimal>, Option<BigDecimal>);

/// Reads `profiles`, `filters`, `filter_keywords` and `filter_categories`
/// with one query each and groups the rows in memory.
///
/// A profile is entitled when it has a Telegram chat id and is either paid
/// or still inside its trial.
#[derive(Clone)]
pub struct PgSubscriberRepository {
    pool: AsyncDbPool,
}

impl PgSubscriberRepository {
    pub fn new(pool: AsyncDbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FilterProvider for PgSubscriberRepository {
    async fn list_active_subscribers(&self, now: Timestamp) -> AppResult<Vec<Subscriber>> {
        use crate::schema::{filter_categories, filter_keywords, filters, profiles};

        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| AppError::ConnectionPool {
                source: anyhow::Error::from(e),
            })?;

        let entitled: Vec<(Uuid, Option<String>)> = profiles::table
            .filter(profiles::telegram_id.is_not_null())
            .filter(
                profiles::is_paid
                    .eq(true)
                    .or(profiles::trial_end.ge(jiff_diesel::Timestamp::from(now))),
            )
            .select((profiles::id, profiles::telegram_id))
            .load(&mut conn)
            .await
            .map_err(AppError::from)?;

        if entitled.is_empty() {
            return Ok(Vec::new());
        }

        let user_ids: Vec<Uuid> = entitled.iter().map(|(id, _)| *id).collect();
        let filter_rows: Vec<FilterRow> = filters::table
            .filter(filters::user_id.eq_any(user_ids))
            .order(filters::created_at.asc())
            .select((
                filters::id,
                filters::user_id,
                filters::name,
                filters::min_price,
                filters::max_price,
            ))
            .load(&mut conn)
            .await
            .map_err(AppError::from)?;

        if filter_rows.is_empty() {
            return Ok(Vec::new());
        }

        let filter_ids: Vec<Uuid> = filter_rows.iter().map(|row| row.0).collect();
        let keywords: Vec<(Uuid, String)> = filter_keywords::table
            .filter(filter_keywords::filter_id.eq_any(filter_ids.clone()))
            .select((filter_keywords::filter_id, filter_keywords::keyword))
            .load(&mut conn)
            .await
            .map_err(AppError::from)?;

        let categories: Vec<(Uuid, String)> = filter_categories::table
            .filter(filter_categories::filter_id.eq_any(filter_ids))
            .select((filter_categories::filter_id, filter_categories::category))
            .load(&mut conn)
            .await
            .map_err(AppError::from)?;

        Ok(assemble_subscribers(entitled, filter_rows, keywords, categories))
    }
}

/// Groups flat rows into subscribers, keeping profile and filter order.
/// Profiles without filters or with a blank chat id are dropped.
fn assemble_subscribers(
    profiles: Vec<(Uuid, Option<String>)>,
    filter_rows: Vec<FilterRow>,
    keywords: Vec<(Uuid, String)>,
    categories: Vec<(Uuid, String)>,
) -> Vec<Subscriber> {
    let mut keywords_by_filter: HashMap<Uuid, Vec<String>> = HashMap::new();
    for (filter_id, keyword) in keywords {
        keywords_by_filter.entry(filter_id).or_default().push(keyword);
    }

    let mut categories_by_filter: HashMap<Uuid, Vec<String>> = HashMap::new();
    for (filter_id, category) in categories {
        categories_by_filter
            .entry(filter_id)
            .or_default()
            .push(category);
    }

    let mut filters_by_user: HashMap<Uuid, Vec<Filter>> = HashMap::new();
    for (filter_id, user_id, name, min_price, max_price) in filter_rows {
        filters_by_user.entry(user_id).or_default().push(Filter {
            user_id,
            name,
            keywords: keywords_by_filter.remove(&filter_id).unwrap_or_default(),
            categories: categories_by_filter.remove(&filter_id).unwrap_or_default(),
            min_price,
            max_price,
        });
    }

    profiles
        .into_iter()
        .filter_map(|(user_id, telegram_id)| {
            let destination = telegram_id.filter(|id| !id.trim().is_empty())?;
            let filters = filters_by_user.remove(&user_id)?;
            Some(Subscriber {
                user_id,
                destination,
                filters,
            })
        })
        .collect()
}
