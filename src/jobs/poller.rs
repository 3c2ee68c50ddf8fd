//! One poll cycle: fetch, ingest, match, notify.
//!
//! The poller is `Idle` between cycles and `Running` during one. A tick that
//! arrives while a cycle is running is skipped. Every failure inside a cycle
//! is logged and folded into the returned [`CycleReport`]; `tick` itself never
//! fails, so the schedule keeps going.
//!
//! The cycle timeout is a deadline, not a cancellation: it is checked between
//! stages and between users, and whatever was not started is picked up by
//! the next tick through the lookback window.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use jiff::{SignedDuration, Timestamp};
use serde::Serialize;
use tokio::time::Instant;
use tracing::Instrument;

use crate::config::{MatchScope, Settings};
use crate::error::AppResult;
use crate::external::JobSource;
use crate::models::Listing;
use crate::repositories::{FilterProvider, JobStore};
use crate::services::{AlertCoordinator, AlertReport, JobIngestor};
use crate::utils::bounded;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PollerState {
    Idle,
    Running,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "error")]
pub enum CycleOutcome {
    /// Ingest and alerting both ran
    Completed,
    /// The source returned nothing; matching was skipped
    EmptyFetch,
    /// A previous cycle was still running
    Overlapped,
    Failed(String),
    /// The cycle deadline passed; work not started is left for the next tick
    TimedOut,
}

#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub cycle: u64,
    pub outcome: CycleOutcome,
    pub fetched: usize,
    pub inserted: usize,
    pub duplicates: usize,
    pub malformed: usize,
    /// Listings handed to the coordinator
    pub candidates: usize,
    pub alerts: Option<AlertReport>,
    pub duration_ms: u64,
}

impl CycleReport {
    pub fn new(cycle: u64, outcome: CycleOutcome) -> Self {
        Self {
            cycle,
            outcome,
            fetched: 0,
            inserted: 0,
            duplicates: 0,
            malformed: 0,
            candidates: 0,
            alerts: None,
            duration_ms: 0,
        }
    }
}

/// Time bounds and matching scope of a poller.
#[derive(Debug, Clone)]
pub struct PollerOptions {
    pub lookback: SignedDuration,
    pub match_scope: MatchScope,
    pub cycle_timeout: Duration,
    pub fetch_timeout: Duration,
    pub operation_timeout: Duration,
}

impl PollerOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            lookback: SignedDuration::from_mins(settings.poller.lookback_minutes),
            match_scope: settings.poller.match_scope,
            cycle_timeout: Duration::from_secs(settings.poller.cycle_timeout),
            // The HTTP client enforces the source timeout; this catches anything else
            fetch_timeout: Duration::from_secs(settings.source.apify.timeout_seconds + 5),
            operation_timeout: Duration::from_secs(settings.storage.operation_timeout),
        }
    }
}

impl Default for PollerOptions {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

/// Resets the running flag when the cycle ends, including on timeout.
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct Poller {
    source: Arc<dyn JobSource>,
    jobs: Arc<dyn JobStore>,
    subscribers: Arc<dyn FilterProvider>,
    ingestor: JobIngestor,
    coordinator: AlertCoordinator,
    options: PollerOptions,
    running: AtomicBool,
    cycles: AtomicU64,
}

impl Poller {
    pub fn new(
        source: Arc<dyn JobSource>,
        jobs: Arc<dyn JobStore>,
        subscribers: Arc<dyn FilterProvider>,
        coordinator: AlertCoordinator,
        options: PollerOptions,
    ) -> Self {
        Self {
            ingestor: JobIngestor::new(jobs.clone(), options.operation_timeout),
            source,
            jobs,
            subscribers,
            coordinator,
            options,
            running: AtomicBool::new(false),
            cycles: AtomicU64::new(0),
        }
    }

    pub fn state(&self) -> PollerState {
        if self.running.load(Ordering::Acquire) {
            PollerState::Running
        } else {
            PollerState::Idle
        }
    }

    pub fn options(&self) -> &PollerOptions {
        &self.options
    }

    /// Runs one cycle unless one is already in flight.
    pub async fn tick(&self, now: Timestamp) -> CycleReport {
        let cycle = self.cycles.fetch_add(1, Ordering::Relaxed) + 1;

        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::warn!(cycle, "Previous cycle still running, skipping tick");
            return CycleReport::new(cycle, CycleOutcome::Overlapped);
        }
        let _guard = RunningGuard(&self.running);

        let span = tracing::info_span!("poll_cycle", cycle);
        let started = Instant::now();
        let deadline = started + self.options.cycle_timeout;

        let mut report = match self
            .run_cycle(cycle, now, deadline)
            .instrument(span.clone())
            .await
        {
            Ok(report) => report,
            Err(e) => {
                span.in_scope(|| tracing::error!(error = %e, "Poll cycle failed"));
                CycleReport::new(cycle, CycleOutcome::Failed(e.to_string()))
            }
        };

        report.duration_ms = started.elapsed().as_millis() as u64;
        span.in_scope(|| {
            tracing::info!(
                outcome = ?report.outcome,
                inserted = report.inserted,
                sent = report.alerts.as_ref().map(|a| a.sent).unwrap_or_default(),
                duration_ms = report.duration_ms,
                "Poll cycle finished"
            )
        });
        report
    }

    /// Waits for an in-flight cycle to finish, up to `limit`.
    pub async fn wait_idle(&self, limit: Duration) -> bool {
        let deadline = Instant::now() + limit;
        while self.state() == PollerState::Running {
            if Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        true
    }

    /// Every external call is bounded on its own. `deadline` is only checked
    /// between stages and between users, so a started delivery is always
    /// recorded before the cycle gives up.
    async fn run_cycle(
        &self,
        cycle: u64,
        now: Timestamp,
        deadline: Instant,
    ) -> AppResult<CycleReport> {
        let raw = match tokio::time::timeout(self.options.fetch_timeout, self.source.fetch()).await {
            Ok(raw) => raw,
            Err(_) => {
                tracing::error!(source = self.source.name(), "Listing fetch timed out");
                Vec::new()
            }
        };

        if raw.is_empty() {
            tracing::warn!(source = self.source.name(), "No listings fetched, skipping cycle");
            return Ok(CycleReport::new(cycle, CycleOutcome::EmptyFetch));
        }

        let ingest = self.ingestor.ingest(raw, now).await?;
        let mut report = CycleReport::new(cycle, CycleOutcome::Completed);
        report.fetched = ingest.fetched;
        report.inserted = ingest.inserted_count();
        report.duplicates = ingest.duplicates;
        report.malformed = ingest.malformed;

        let since = now - self.options.lookback;
        let candidates: Vec<Listing> = match self.options.match_scope {
            MatchScope::Inserted => ingest
                .inserted
                .into_iter()
                .filter(|listing| listing.published_at >= since)
                .collect(),
            MatchScope::Lookback => {
                bounded(
                    self.options.operation_timeout,
                    "query recent listings",
                    self.jobs.query_recent(since),
                )
                .await?
            }
        };
        report.candidates = candidates.len();

        if candidates.is_empty() {
            tracing::info!("No listings to match this cycle");
            return Ok(report);
        }

        if Instant::now() >= deadline {
            tracing::error!(
                seconds = self.options.cycle_timeout.as_secs(),
                "Poll cycle out of time before alerting"
            );
            report.outcome = CycleOutcome::TimedOut;
            return Ok(report);
        }

        let subscribers = bounded(
            self.options.operation_timeout,
            "list subscribers",
            self.subscribers.list_active_subscribers(now),
        )
        .await?;
        tracing::debug!(subscribers = subscribers.len(), candidates = candidates.len(), "Matching");

        let alerts = self
            .coordinator
            .run_until(&subscribers, &candidates, now, Some(deadline))
            .await?;
        if alerts.users_deferred > 0 {
            tracing::error!(
                seconds = self.options.cycle_timeout.as_secs(),
                users_deferred = alerts.users_deferred,
                "Poll cycle timed out"
            );
            report.outcome = CycleOutcome::TimedOut;
        }
        report.alerts = Some(alerts);
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::{Filter, RawListing, Subscriber};
    use crate::repositories::MemoryStore;
    use crate::services::notifications::{DeliveryResult, Notifier};
    use crate::services::AlertPolicy;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use uuid::Uuid;

    fn now() -> Timestamp {
        "2025-03-01T12:00:00Z".parse::<Timestamp>().unwrap()
    }

    struct StaticSource {
        items: Vec<RawListing>,
        delay: Duration,
    }

    #[async_trait]
    impl JobSource for StaticSource {
        async fn fetch(&self) -> Vec<RawListing> {
            tokio::time::sleep(self.delay).await;
            self.items.clone()
        }

        fn name(&self) -> &'static str {
            "static"
        }
    }

    struct StaticSubscribers(Vec<Subscriber>);

    #[async_trait]
    impl FilterProvider for StaticSubscribers {
        async fn list_active_subscribers(&self, _now: Timestamp) -> AppResult<Vec<Subscriber>> {
            Ok(self.0.clone())
        }
    }

    struct UnavailableSubscribers;

    #[async_trait]
    impl FilterProvider for UnavailableSubscribers {
        async fn list_active_subscribers(&self, _now: Timestamp) -> AppResult<Vec<Subscriber>> {
            Err(AppError::ConnectionPool {
                source: anyhow::anyhow!("refused"),
            })
        }
    }

    #[derive(Default)]
    struct CountingNotifier(Mutex<usize>);

    #[async_trait]
    impl Notifier for CountingNotifier {
        async fn deliver(&self, _destination: &str, listings: &[Listing]) -> AppResult<DeliveryResult> {
            *self.0.lock().unwrap() += listings.len();
            Ok(DeliveryResult {
                success: true,
                status_code: None,
                response: None,
                duration_ms: 0,
            })
        }

        fn name(&self) -> &'static str {
            "counting"
        }
    }

    fn raw(id: &str, published_at: Timestamp) -> RawListing {
        RawListing {
            title: Some(format!("Rust job {}", id)),
            url: Some(format!("https://www.upwork.com/jobs/~{}", id)),
            published_at: Some(published_at.to_string()),
            ..RawListing::default()
        }
    }

    fn everyone() -> Vec<Subscriber> {
        let user_id = Uuid::new_v4();
        vec![Subscriber {
            user_id,
            destination: "42".to_string(),
            filters: vec![Filter {
                user_id,
                keywords: vec!["rust".to_string()],
                ..Filter::default()
            }],
        }]
    }

    fn poller(
        items: Vec<RawListing>,
        subscribers: Arc<dyn FilterProvider>,
        store: Arc<MemoryStore>,
        notifier: Arc<CountingNotifier>,
        options: PollerOptions,
    ) -> Poller {
        let coordinator = AlertCoordinator::new(store.clone(), notifier, AlertPolicy::default());
        Poller::new(
            Arc::new(StaticSource {
                items,
                delay: Duration::ZERO,
            }),
            store,
            subscribers,
            coordinator,
            options,
        )
    }

    #[tokio::test]
    async fn test_cycle_ingests_and_notifies() {
        let store = Arc::new(MemoryStore::new());
        let notifier = Arc::new(CountingNotifier::default());
        let p = poller(
            vec![raw("a1", now()), raw("a2", now())],
            Arc::new(StaticSubscribers(everyone())),
            store.clone(),
            notifier.clone(),
            PollerOptions::default(),
        );

        let report = p.tick(now()).await;
        assert_eq!(report.outcome, CycleOutcome::Completed);
        assert_eq!(report.inserted, 2);
        assert_eq!(report.alerts.unwrap().sent, 2);
        assert_eq!(*notifier.0.lock().unwrap(), 2);
        assert_eq!(p.state(), PollerState::Idle);
    }

    #[tokio::test]
    async fn test_empty_fetch_skips_matching() {
        let p = poller(
            Vec::new(),
            Arc::new(UnavailableSubscribers),
            Arc::new(MemoryStore::new()),
            Arc::new(CountingNotifier::default()),
            PollerOptions::default(),
        );

        let report = p.tick(now()).await;
        assert_eq!(report.outcome, CycleOutcome::EmptyFetch);
        assert!(report.alerts.is_none());
    }

    #[tokio::test]
    async fn test_inserted_scope_ignores_stale_listings() {
        let store = Arc::new(MemoryStore::new());
        let p = poller(
            vec![raw("b1", now()), raw("b2", now() - SignedDuration::from_hours(3))],
            Arc::new(StaticSubscribers(everyone())),
            store.clone(),
            Arc::new(CountingNotifier::default()),
            PollerOptions {
                match_scope: MatchScope::Inserted,
                ..PollerOptions::default()
            },
        );

        let report = p.tick(now()).await;
        assert_eq!(report.inserted, 2);
        assert_eq!(report.candidates, 1);
    }

    #[tokio::test]
    async fn test_lookback_scope_rematches_stored_listings() {
        let store = Arc::new(MemoryStore::new());
        let notifier = Arc::new(CountingNotifier::default());
        let options = PollerOptions {
            match_scope: MatchScope::Lookback,
            ..PollerOptions::default()
        };
        let items = vec![raw("c1", now())];

        // First cycle stores the listing but nobody is subscribed yet
        let first = poller(
            items.clone(),
            Arc::new(StaticSubscribers(Vec::new())),
            store.clone(),
            notifier.clone(),
            options.clone(),
        );
        first.tick(now()).await;

        let second = poller(
            items,
            Arc::new(StaticSubscribers(everyone())),
            store.clone(),
            notifier.clone(),
            options,
        );
        let report = second.tick(now()).await;
        assert_eq!(report.inserted, 0);
        assert_eq!(report.candidates, 1);
        assert_eq!(*notifier.0.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_failure_is_reported_not_raised() {
        let p = poller(
            vec![raw("d1", now())],
            Arc::new(UnavailableSubscribers),
            Arc::new(MemoryStore::new()),
            Arc::new(CountingNotifier::default()),
            PollerOptions::default(),
        );

        let report = p.tick(now()).await;
        assert!(matches!(report.outcome, CycleOutcome::Failed(_)));
        assert_eq!(p.state(), PollerState::Idle);

        // The next tick still runs
        let next = p.tick(now()).await;
        assert_eq!(next.cycle, 2);
    }

    #[tokio::test]
    async fn test_overlapping_tick_is_skipped() {
        let store = Arc::new(MemoryStore::new());
        let coordinator = AlertCoordinator::new(
            store.clone(),
            Arc::new(CountingNotifier::default()),
            AlertPolicy::default(),
        );
        let p = Arc::new(Poller::new(
            Arc::new(StaticSource {
                items: vec![raw("e1", now())],
                delay: Duration::from_millis(300),
            }),
            store,
            Arc::new(StaticSubscribers(everyone())),
            coordinator,
            PollerOptions::default(),
        ));

        let slow = tokio::spawn({
            let p = p.clone();
            async move { p.tick(now()).await }
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(p.state(), PollerState::Running);

        let skipped = p.tick(now()).await;
        assert_eq!(skipped.outcome, CycleOutcome::Overlapped);

        assert_eq!(slow.await.unwrap().outcome, CycleOutcome::Completed);
        assert!(p.wait_idle(Duration::from_secs(1)).await);
    }

    /// Fails the first call, then serves `subscribers`.
    struct RecoveringSubscribers {
        failed_once: AtomicBool,
        subscribers: Vec<Subscriber>,
    }

    #[async_trait]
    impl FilterProvider for RecoveringSubscribers {
        async fn list_active_subscribers(&self, _now: Timestamp) -> AppResult<Vec<Subscriber>> {
            if !self.failed_once.swap(true, Ordering::SeqCst) {
                return Err(AppError::ConnectionPool {
                    source: anyhow::anyhow!("refused"),
                });
            }
            Ok(self.subscribers.clone())
        }
    }

    #[tokio::test]
    async fn test_alerting_failure_is_retried_next_tick() {
        let store = Arc::new(MemoryStore::new());
        let notifier = Arc::new(CountingNotifier::default());
        let p = poller(
            vec![raw("g1", now())],
            Arc::new(RecoveringSubscribers {
                failed_once: AtomicBool::new(false),
                subscribers: everyone(),
            }),
            store.clone(),
            notifier.clone(),
            PollerOptions::default(),
        );

        let first = p.tick(now()).await;
        assert!(matches!(first.outcome, CycleOutcome::Failed(_)));
        assert_eq!(store.listing_count(), 1);
        assert_eq!(*notifier.0.lock().unwrap(), 0);

        let second = p.tick(now() + SignedDuration::from_mins(1)).await;
        assert_eq!(second.outcome, CycleOutcome::Completed);
        assert_eq!(second.inserted, 0);
        assert_eq!(second.candidates, 1);
        assert_eq!(*notifier.0.lock().unwrap(), 1);
        assert_eq!(store.alert_records().len(), 1);
    }

    struct SlowNotifier {
        delay: Duration,
        destinations: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Notifier for SlowNotifier {
        async fn deliver(&self, destination: &str, _listings: &[Listing]) -> AppResult<DeliveryResult> {
            tokio::time::sleep(self.delay).await;
            self.destinations.lock().unwrap().push(destination.to_string());
            Ok(DeliveryResult {
                success: true,
                status_code: None,
                response: None,
                duration_ms: self.delay.as_millis() as u64,
            })
        }

        fn name(&self) -> &'static str {
            "slow"
        }
    }

    #[tokio::test]
    async fn test_cycle_deadline_never_splits_delivery_and_record() {
        let store = Arc::new(MemoryStore::new());
        let notifier = Arc::new(SlowNotifier {
            delay: Duration::from_millis(300),
            destinations: Mutex::new(Vec::new()),
        });
        let subscribers: Vec<Subscriber> = (1..=3)
            .map(|n| Subscriber {
                destination: format!("u{}", n),
                ..everyone().remove(0)
            })
            .collect();
        let coordinator = AlertCoordinator::new(store.clone(), notifier.clone(), AlertPolicy::default());
        let p = Poller::new(
            Arc::new(StaticSource {
                items: vec![raw("h1", now())],
                delay: Duration::ZERO,
            }),
            store.clone(),
            Arc::new(StaticSubscribers(subscribers)),
            coordinator,
            PollerOptions {
                cycle_timeout: Duration::from_millis(450),
                ..PollerOptions::default()
            },
        );

        let first = p.tick(now()).await;
        assert_eq!(first.outcome, CycleOutcome::TimedOut);
        assert_eq!(p.state(), PollerState::Idle);
        let alerts = first.alerts.unwrap();
        assert_eq!(alerts.sent, 2);
        assert_eq!(alerts.users_deferred, 1);
        assert_eq!(
            store.alert_records().len(),
            notifier.destinations.lock().unwrap().len()
        );

        let second = p.tick(now() + SignedDuration::from_mins(1)).await;
        assert_eq!(second.outcome, CycleOutcome::Completed);
        assert_eq!(second.alerts.unwrap().sent, 1);
        assert_eq!(store.alert_records().len(), 3);
        assert_eq!(*notifier.destinations.lock().unwrap(), vec!["u1", "u2", "u3"]);
    }
}
