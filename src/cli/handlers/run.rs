//! Run command handler
//!
//! Polls on a fixed interval until Ctrl+C or SIGTERM.

use std::sync::Arc;
use std::time::Duration;

use tokio::signal;
use tokio_util::sync::CancellationToken;

use crate::config::Settings;
use crate::error::AppResult;
use crate::jobs::PollScheduler;
use crate::state::AppState;

pub struct RunCommandHandler {
    config: Settings,
}

impl RunCommandHandler {
    pub fn new(config: Settings) -> Self {
        Self { config }
    }

    /// Builds the pipeline and blocks until a shutdown signal arrives.
    pub async fn execute(self) -> AppResult<()> {
        let interval = Duration::from_secs(self.config.poller.interval_seconds);
        let run_on_start = self.config.poller.run_on_start;

        let state = AppState::from_settings(self.config).await?;
        let poller = Arc::new(state.poller());
        let scheduler = PollScheduler::new(poller, interval, run_on_start).await?;

        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            shutdown_signal().await;
            trigger.cancel();
        });

        tracing::info!(
            interval_secs = interval.as_secs(),
            run_on_start,
            "Poller running, press Ctrl+C to stop"
        );

        scheduler.run_until_cancelled(token).await
    }
}

/// Resolves on Ctrl+C, or SIGTERM on unix.
///
/// A handler that cannot be installed never resolves, leaving the other
/// signal in charge.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, shutting down");
        },
    }
}
