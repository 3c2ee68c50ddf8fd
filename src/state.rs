//! Application wiring.
//!
//! Builds the stores, source and notifier selected by configuration and
//! assembles them into a [`Poller`].

use std::sync::Arc;
use std::time::Duration;

use crate::config::{Settings, StorageBackend};
use crate::db::{establish_async_connection_pool, run_migrations};
use crate::error::{AppError, AppResult};
use crate::external::{ApifySource, JobSource};
use crate::jobs::{Poller, PollerOptions};
use crate::repositories::{FileFilterProvider, MemoryStore, Repositories};
use crate::services::{AlertCoordinator, AlertPolicy, Notifier, build_notifier};

/// Shared collaborators of the pipeline.
///
/// Cloning is cheap; every collaborator sits behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub repositories: Repositories,
    pub source: Arc<dyn JobSource>,
    pub notifier: Arc<dyn Notifier>,
}

impl AppState {
    /// Connects the configured backend and builds the HTTP collaborators.
    ///
    /// With the postgres backend and `database.auto_migrate`, pending
    /// migrations are applied before the pool is created.
    pub async fn from_settings(settings: Settings) -> AppResult<Self> {
        let repositories = match settings.storage.backend {
            StorageBackend::Postgres => {
                if settings.database.auto_migrate {
                    let applied = run_migrations(&settings.database.url).await?;
                    tracing::info!(applied = applied.len(), "Database migrations applied");
                }
                let pool = establish_async_connection_pool(&settings.database).await?;
                Repositories::postgres(pool)
            }
            StorageBackend::Memory => {
                let path = settings.storage.subscribers_file.clone().ok_or_else(|| {
                    AppError::Validation {
                        field: "storage.subscribers_file".to_string(),
                        reason: "required for the memory backend".to_string(),
                    }
                })?;
                tracing::warn!("Using in-memory storage, nothing survives a restart");
                Repositories::memory(Arc::new(MemoryStore::new()), FileFilterProvider::new(path))
            }
        };

        let source: Arc<dyn JobSource> = Arc::new(ApifySource::new(&settings.source.apify)?);
        let notifier = build_notifier(&settings.notifier)?;

        tracing::info!(
            backend = ?settings.storage.backend,
            source = source.name(),
            notifier = notifier.name(),
            "Pipeline collaborators ready"
        );

        Ok(Self::new(settings, repositories, source, notifier))
    }

    pub fn new(
        settings: Settings,
        repositories: Repositories,
        source: Arc<dyn JobSource>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            settings: Arc::new(settings),
            repositories,
            source,
            notifier,
        }
    }

    pub fn poller(&self) -> Poller {
        let operation_timeout = Duration::from_secs(self.settings.storage.operation_timeout);
        let coordinator = AlertCoordinator::new(
            self.repositories.alerts.clone(),
            self.notifier.clone(),
            AlertPolicy::from_config(&self.settings.alerts, operation_timeout),
        );

        Poller::new(
            self.source.clone(),
            self.repositories.jobs.clone(),
            self.repositories.subscribers.clone(),
            coordinator,
            PollerOptions::from_settings(&self.settings),
        )
    }
}
