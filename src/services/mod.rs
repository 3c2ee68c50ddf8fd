//! Pipeline stages.
//!
//! The ingestor stores new listings, the matcher evaluates filters and the
//! coordinator turns matches into deliveries and alert records. Stages hold
//! their collaborators as injected trait objects.

pub mod coordinator;
pub mod ingestor;
pub mod matcher;
pub mod notifications;

pub use coordinator::{AlertCoordinator, AlertPolicy, AlertReport};
pub use ingestor::{IngestReport, JobIngestor};
pub use matcher::FilterMatcher;
pub use notifications::{DeliveryResult, LogNotifier, Notifier, TelegramNotifier, build_notifier};
