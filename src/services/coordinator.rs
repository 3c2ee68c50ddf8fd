//! Decides which (user, listing) pairs to notify and keeps the record of
//! what was sent.
//!
//! Guarantees per run:
//! - a pair with an existing alert record is never delivered again
//! - a pair matched by several filters of one user is queued once
//! - a user gets at most `max_per_window` pairs per trailing window,
//!   counting what earlier runs already recorded; the excess is dropped
//!
//! Records are written right after each delivery attempt. The store's
//! (user, listing) uniqueness constraint is the backstop when two runs race.
//! A run with a deadline stops between users, never between a delivery and
//! its record; users it did not reach keep their pairs unrecorded.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use jiff::{SignedDuration, Timestamp};
use serde::Serialize;
use tokio::time::Instant;
use uuid::Uuid;

use crate::config::AlertsConfig;
use crate::error::{AppError, AppResult};
use crate::models::{AlertKey, Listing, NewAlertRecord, Subscriber};
use crate::repositories::AlertStore;
use crate::services::matcher::FilterMatcher;
use crate::services::notifications::Notifier;
use crate::utils::bounded;

/// Rate window, batching and recording rules for one coordinator.
#[derive(Debug, Clone)]
pub struct AlertPolicy {
    pub window: SignedDuration,
    pub max_per_window: u32,
    pub max_listings_per_message: usize,
    /// Write a record (with `delivered = false`) after a failed attempt
    pub record_failed_deliveries: bool,
    pub delivery_timeout: Duration,
    /// Bound on every alert store call
    pub operation_timeout: Duration,
}

impl AlertPolicy {
    pub fn from_config(config: &AlertsConfig, operation_timeout: Duration) -> Self {
        Self {
            window: SignedDuration::from_mins(config.window_minutes),
            max_per_window: config.max_per_window,
            max_listings_per_message: config.max_listings_per_message.max(1),
            record_failed_deliveries: config.record_failed_deliveries,
            delivery_timeout: Duration::from_secs(config.delivery_timeout),
            operation_timeout,
        }
    }
}

impl Default for AlertPolicy {
    fn default() -> Self {
        Self::from_config(&AlertsConfig::default(), Duration::from_secs(10))
    }
}

/// Outcome of one `run`, counted in (user, listing) pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AlertReport {
    /// Distinct pairs produced by matching
    pub candidates: usize,
    /// Pairs recorded by an earlier run
    pub already_sent: usize,
    /// Pairs dropped by the per-user cap
    pub rate_limited: usize,
    /// Pairs in deliveries the channel accepted
    pub sent: usize,
    /// Pairs in deliveries that failed or timed out
    pub failed: usize,
    /// Alert records written
    pub recorded: usize,
    /// Users skipped because of an error in their own processing
    pub users_failed: usize,
    /// Pairs left unrecorded because the run passed its deadline
    pub deferred: usize,
    /// Users not reached before the deadline
    pub users_deferred: usize,
}

#[derive(Debug, Default)]
struct UserOutcome {
    rate_limited: usize,
    sent: usize,
    failed: usize,
    recorded: usize,
}

pub struct AlertCoordinator {
    alerts: Arc<dyn AlertStore>,
    notifier: Arc<dyn Notifier>,
    policy: AlertPolicy,
}

impl AlertCoordinator {
    pub fn new(alerts: Arc<dyn AlertStore>, notifier: Arc<dyn Notifier>, policy: AlertPolicy) -> Self {
        Self {
            alerts,
            notifier,
            policy,
        }
    }

    pub fn policy(&self) -> &AlertPolicy {
        &self.policy
    }

    /// Notifies every subscriber about their unsent matches among `listings`.
    ///
    /// Delivery problems are logged and counted. A user whose bookkeeping
    /// fails is skipped; an unavailable alert store ends the run with an error.
    pub async fn run(
        &self,
        subscribers: &[Subscriber],
        listings: &[Listing],
        now: Timestamp,
    ) -> AppResult<AlertReport> {
        self.run_until(subscribers, listings, now, None).await
    }

    /// Like [`run`](Self::run), but users not started by `deadline` are
    /// skipped and reported as deferred. A user already started is always
    /// finished, so every delivery made is also recorded.
    pub async fn run_until(
        &self,
        subscribers: &[Subscriber],
        listings: &[Listing],
        now: Timestamp,
        deadline: Option<Instant>,
    ) -> AppResult<AlertReport> {
        let mut report = AlertReport::default();
        if subscribers.is_empty() || listings.is_empty() {
            return Ok(report);
        }

        let queues = collect_candidates(subscribers, listings);
        let keys: Vec<AlertKey> = queues
            .iter()
            .flat_map(|(subscriber, queued)| {
                queued
                    .iter()
                    .map(|listing| AlertKey::new(subscriber.user_id, listing.id.clone()))
            })
            .collect();
        report.candidates = keys.len();
        if keys.is_empty() {
            return Ok(report);
        }

        let already_sent = bounded(
            self.policy.operation_timeout,
            "check sent alerts",
            self.alerts.exists_bulk(&keys),
        )
        .await?;

        for (subscriber, mut queued) in queues {
            let before = queued.len();
            queued.retain(|listing| {
                !already_sent.contains(&AlertKey::new(subscriber.user_id, listing.id.clone()))
            });
            report.already_sent += before - queued.len();
            if queued.is_empty() {
                continue;
            }

            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                report.deferred += queued.len();
                report.users_deferred += 1;
                continue;
            }

            match self.notify_user(subscriber, queued, now).await {
                Ok(outcome) => {
                    tracing::info!(
                        user_id = %subscriber.user_id,
                        sent = outcome.sent,
                        failed = outcome.failed,
                        rate_limited = outcome.rate_limited,
                        "Alerts dispatched"
                    );
                    report.rate_limited += outcome.rate_limited;
                    report.sent += outcome.sent;
                    report.failed += outcome.failed;
                    report.recorded += outcome.recorded;
                }
                Err(e) if e.is_storage_unavailable() => {
                    tracing::error!(
                        user_id = %subscriber.user_id,
                        error = %e,
                        "Alert store unavailable, aborting alert run"
                    );
                    return Err(e);
                }
                Err(e) => {
                    tracing::warn!(user_id = %subscriber.user_id, error = %e, "Skipping user");
                    report.users_failed += 1;
                }
            }
        }

        if report.users_deferred > 0 {
            tracing::warn!(
                users = report.users_deferred,
                pairs = report.deferred,
                "Alert run passed its deadline, remaining users deferred"
            );
        }

        Ok(report)
    }

    async fn notify_user(
        &self,
        subscriber: &Subscriber,
        mut queued: Vec<&Listing>,
        now: Timestamp,
    ) -> AppResult<UserOutcome> {
        let mut outcome = UserOutcome::default();

        let recent = bounded(
            self.policy.operation_timeout,
            "count recent alerts",
            self.alerts.count_since(subscriber.user_id, now - self.policy.window),
        )
        .await?;

        let remaining = (i64::from(self.policy.max_per_window) - recent).max(0) as usize;
        if queued.len() > remaining {
            // Newest listings win the remaining budget
            queued.sort_by(|a, b| b.published_at.cmp(&a.published_at));
            outcome.rate_limited = queued.len() - remaining;
            queued.truncate(remaining);
            tracing::debug!(
                user_id = %subscriber.user_id,
                recent,
                dropped = outcome.rate_limited,
                "Rate cap reached"
            );
        }

        for chunk in queued.chunks(self.policy.max_listings_per_message) {
            let batch: Vec<Listing> = chunk.iter().map(|listing| (*listing).clone()).collect();
            let delivered = self.deliver(subscriber, &batch).await;

            if delivered {
                outcome.sent += batch.len();
            } else {
                outcome.failed += batch.len();
                if !self.policy.record_failed_deliveries {
                    continue;
                }
            }

            for listing in &batch {
                let record = NewAlertRecord {
                    user_id: subscriber.user_id,
                    listing_id: listing.id.clone(),
                    sent_at: now,
                    delivered,
                };
                if self.record(&record).await? {
                    outcome.recorded += 1;
                }
            }
        }

        Ok(outcome)
    }

    /// One bounded delivery attempt. Never fails the caller.
    async fn deliver(&self, subscriber: &Subscriber, batch: &[Listing]) -> bool {
        let attempt = tokio::time::timeout(
            self.policy.delivery_timeout,
            self.notifier.deliver(&subscriber.destination, batch),
        )
        .await;

        match attempt {
            Ok(Ok(result)) if result.success => {
                tracing::debug!(
                    user_id = %subscriber.user_id,
                    listings = batch.len(),
                    duration_ms = result.duration_ms,
                    "Delivered"
                );
                true
            }
            Ok(Ok(result)) => {
                tracing::warn!(
                    user_id = %subscriber.user_id,
                    channel = self.notifier.name(),
                    status = ?result.status_code,
                    response = result.response.as_deref().unwrap_or_default(),
                    "Delivery rejected"
                );
                false
            }
            Ok(Err(e)) => {
                tracing::warn!(user_id = %subscriber.user_id, error = %e, "Delivery failed");
                false
            }
            Err(_) => {
                tracing::warn!(
                    user_id = %subscriber.user_id,
                    channel = self.notifier.name(),
                    seconds = self.policy.delivery_timeout.as_secs(),
                    "Delivery timed out"
                );
                false
            }
        }
    }

    /// `Ok(false)` when another run recorded the pair first.
    async fn record(&self, record: &NewAlertRecord) -> AppResult<bool> {
        match bounded(
            self.policy.operation_timeout,
            "record alert",
            self.alerts.insert(record),
        )
        .await
        {
            Ok(true) => Ok(true),
            Ok(false) | Err(AppError::Duplicate { .. }) => {
                tracing::debug!(
                    user_id = %record.user_id,
                    listing_id = %record.listing_id,
                    "Alert already recorded"
                );
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }
}

/// Matched listings per subscriber, each pair at most once per run.
fn collect_candidates<'s, 'l>(
    subscribers: &'s [Subscriber],
    listings: &'l [Listing],
) -> Vec<(&'s Subscriber, Vec<&'l Listing>)> {
    let mut queued: HashSet<(Uuid, &str)> = HashSet::new();
    let mut positions: HashMap<Uuid, usize> = HashMap::new();
    let mut queues: Vec<(&Subscriber, Vec<&Listing>)> = Vec::new();

    for subscriber in subscribers {
        let position = *positions.entry(subscriber.user_id).or_insert_with(|| {
            queues.push((subscriber, Vec::new()));
            queues.len() - 1
        });

        for filter in &subscriber.filters {
            for listing in FilterMatcher::match_listings(listings, filter) {
                if queued.insert((subscriber.user_id, listing.id.as_str())) {
                    queues[position].1.push(listing);
                }
            }
        }
    }

    queues
}
