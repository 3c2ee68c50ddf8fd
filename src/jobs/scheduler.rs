use std::sync::Arc;
use std::time::Duration;

use jiff::Timestamp;
use tokio_cron_scheduler::{Job, JobScheduler};
use tokio_util::sync::CancellationToken;

use crate::error::{AppError, AppResult};
use crate::jobs::poller::Poller;

/// Drives a [`Poller`] on a fixed interval until cancelled.
///
/// Cancellation stops new ticks; a cycle already in flight is given up to
/// its cycle timeout to finish.
pub struct PollScheduler {
    scheduler: JobScheduler,
    poller: Arc<Poller>,
    interval: Duration,
    run_on_start: bool,
}

impl PollScheduler {
    pub async fn new(poller: Arc<Poller>, interval: Duration, run_on_start: bool) -> AppResult<Self> {
        let scheduler = JobScheduler::new().await.map_err(|e| AppError::Internal {
            source: anyhow::Error::from(e),
        })?;

        Ok(Self {
            scheduler,
            poller,
            interval,
            run_on_start,
        })
    }

    async fn schedule(&self) -> AppResult<()> {
        let poller = Arc::clone(&self.poller);

        let job = Job::new_repeated_async(self.interval, move |_uuid, _lock| {
            let poller = Arc::clone(&poller);
            Box::pin(async move {
                poller.tick(Timestamp::now()).await;
            })
        })
        .map_err(|e| AppError::Internal {
            source: anyhow::Error::from(e),
        })?;

        self.scheduler.add(job).await.map_err(|e| AppError::Internal {
            source: anyhow::Error::from(e),
        })?;

        Ok(())
    }

    /// Runs until `token` is cancelled, then shuts the scheduler down.
    pub async fn run_until_cancelled(mut self, token: CancellationToken) -> AppResult<()> {
        self.schedule().await?;

        if self.run_on_start {
            let poller = Arc::clone(&self.poller);
            tokio::spawn(async move {
                poller.tick(Timestamp::now()).await;
            });
        }

        self.scheduler.start().await.map_err(|e| AppError::Internal {
            source: anyhow::Error::from(e),
        })?;
        tracing::info!(interval_seconds = self.interval.as_secs(), "Poll scheduler started");

        token.cancelled().await;
        tracing::info!("Shutdown requested, stopping poll scheduler");

        self.scheduler.shutdown().await.map_err(|e| AppError::Internal {
            source: anyhow::Error::from(e),
        })?;

        if !self.poller.wait_idle(self.poller.options().cycle_timeout).await {
            tracing::warn!("In-flight cycle did not finish before shutdown");
        }

        tracing::info!("Poll scheduler stopped");
        Ok(())
    }
}
