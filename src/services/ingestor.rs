//! Normalises raw listings and persists the ones not seen before.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use bigdecimal::BigDecimal;
use jiff::Timestamp;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::models::{JobType, Listing, RawListing, UNCATEGORIZED};
use crate::repositories::JobStore;
use crate::utils::bounded;

/// Outcome of one `ingest` call.
#[derive(Debug, Clone, Default)]
pub struct IngestReport {
    pub fetched: usize,
    /// Listings this call inserted, in batch order
    pub inserted: Vec<Listing>,
    /// Already stored, or repeated within the batch
    pub duplicates: usize,
    pub malformed: usize,
    /// Rejected by the store for reasons other than unavailability
    pub failed: usize,
}

impl IngestReport {
    pub fn inserted_count(&self) -> usize {
        self.inserted.len()
    }
}

pub struct JobIngestor {
    jobs: Arc<dyn JobStore>,
    operation_timeout: Duration,
}

impl JobIngestor {
    pub fn new(jobs: Arc<dyn JobStore>, operation_timeout: Duration) -> Self {
        Self {
            jobs,
            operation_timeout,
        }
    }

    /// Stores every new, well-formed listing of `raw`.
    ///
    /// Malformed items and duplicates are skipped. An unavailable store aborts
    /// the batch with an error; listings inserted before that stay stored.
    /// A batch where every store attempt failed is reported as an error too.
    pub async fn ingest(&self, raw: Vec<RawListing>, now: Timestamp) -> AppResult<IngestReport> {
        let mut report = IngestReport {
            fetched: raw.len(),
            ..IngestReport::default()
        };
        let mut seen = HashSet::new();
        let mut attempted = 0usize;
        let mut last_error = None;

        for (index, item) in raw.into_iter().enumerate() {
            let listing = match normalize(item, now) {
                Ok(listing) => listing,
                Err(e) => {
                    tracing::warn!(index, error = %e, "Skipping malformed listing");
                    report.malformed += 1;
                    continue;
                }
            };

            if !seen.insert(listing.id.clone()) {
                report.duplicates += 1;
                continue;
            }

            attempted += 1;
            match self.store(&listing).await {
                Ok(true) => {
                    tracing::debug!(listing_id = %listing.id, "Stored new listing");
                    report.inserted.push(listing);
                }
                Ok(false) => report.duplicates += 1,
                Err(e) if e.is_storage_unavailable() => {
                    tracing::error!(
                        listing_id = %listing.id,
                        inserted = report.inserted.len(),
                        error = %e,
                        "Job store unavailable, aborting ingest"
                    );
                    return Err(e);
                }
                Err(e) => {
                    tracing::warn!(listing_id = %listing.id, error = %e, "Failed to store listing");
                    report.failed += 1;
                    last_error = Some(e);
                }
            }
        }

        if attempted > 0 && report.failed == attempted {
            if let Some(e) = last_error {
                return Err(e);
            }
        }

        tracing::info!(
            fetched = report.fetched,
            inserted = report.inserted.len(),
            duplicates = report.duplicates,
            malformed = report.malformed,
            failed = report.failed,
            "Ingest finished"
        );

        Ok(report)
    }

    async fn store(&self, listing: &Listing) -> AppResult<bool> {
        let exists = bounded(
            self.operation_timeout,
            "check listing",
            self.jobs.exists_by_id(&listing.id),
        )
        .await?;
        if exists {
            return Ok(false);
        }

        // A concurrent cycle may win the race between the check and the insert
        match bounded(self.operation_timeout, "insert listing", self.jobs.insert(listing)).await {
            Err(AppError::Duplicate { .. }) => Ok(false),
            other => other,
        }
    }
}

/// Stable id from a listing URL: query and trailing `/` dropped, then the
/// part after the last `~`, or the last path segment when there is none.
pub fn derive_listing_id(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next().unwrap_or_default().trim_end_matches('/');

    let id = match path.rsplit_once('~') {
        Some((_, suffix)) => suffix,
        None => path.rsplit('/').next().unwrap_or_default(),
    };

    let id = id.trim();
    (!id.is_empty()).then(|| id.to_string())
}

/// Builds a storable listing from a raw record, applying field defaults.
pub fn normalize(raw: RawListing, now: Timestamp) -> AppResult<Listing> {
    let title = required(raw.title, "title")?;
    let url = required(raw.url, "url")?;
    let id = derive_listing_id(&url).ok_or_else(|| AppError::MalformedListing {
        field: "url".to_string(),
        reason: format!("has no listing id: {}", url),
    })?;

    let category = raw
        .category
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| UNCATEGORIZED.to_string());

    let skills = raw
        .skills
        .unwrap_or_default()
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    let published_at = raw
        .published_at
        .as_deref()
        .and_then(|ts| ts.trim().parse::<Timestamp>().ok())
        .unwrap_or(now);

    let listing = Listing {
        id,
        title,
        url,
        category,
        job_type: JobType::from_source(raw.job_type.as_deref()),
        description: raw.description.unwrap_or_default(),
        skills,
        budget: raw.budget.unwrap_or_else(|| BigDecimal::from(0)),
        client_location: raw
            .client_location
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty()),
        client_spend: raw.client_spend,
        client_rating: raw.client_rating,
        published_at,
        ingested_at: now,
    };

    listing.validate().map_err(|e| AppError::MalformedListing {
        field: e
            .field_errors()
            .keys()
            .next()
            .map(|field| field.to_string())
            .unwrap_or_else(|| "listing".to_string()),
        reason: e.to_string(),
    })?;

    Ok(listing)
}

fn required(value: Option<String>, field: &str) -> AppResult<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::MalformedListing {
            field: field.to_string(),
            reason: "is missing".to_string(),
        })
}
