//! Storage collaborators: traits consumed by the pipeline and their
//! PostgreSQL, in-memory and file-backed implementations.

mod alert_repo;
mod file_provider;
mod listing_repo;
mod memory;
mod subscriber_repo;
mod traits;

pub use alert_repo::PgAlertRepository;
pub use file_provider::FileFilterProvider;
pub use listing_repo::PgListingRepository;
pub use memory::MemoryStore;
pub use subscriber_repo::PgSubscriberRepository;
pub use traits::{AlertStore, FilterProvider, JobStore};

use std::sync::Arc;

use crate::db::AsyncDbPool;

/// Shared handles to the three stores the pipeline needs.
#[derive(Clone)]
pub struct Repositories {
    pub jobs: Arc<dyn JobStore>,
    pub alerts: Arc<dyn AlertStore>,
    pub subscribers: Arc<dyn FilterProvider>,
}

impl Repositories {
    /// PostgreSQL-backed stores sharing one pool.
    pub fn postgres(pool: AsyncDbPool) -> Self {
        Self {
            jobs: Arc::new(PgListingRepository::new(pool.clone())),
            alerts: Arc::new(PgAlertRepository::new(pool.clone())),
            subscribers: Arc::new(PgSubscriberRepository::new(pool)),
        }
    }

    /// One `MemoryStore` for listings and alerts, subscribers from a file.
    pub fn memory(store: Arc<MemoryStore>, subscribers: FileFilterProvider) -> Self {
        Self {
            jobs: store.clone(),
            alerts: store,
            subscribers: Arc::new(subscribers),
        }
    }
}
