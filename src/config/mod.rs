//! Configuration management for freelancelot
//!
//! Settings are loaded in layers, lowest priority first:
//! 1. `default.toml`
//! 2. `{environment}.toml`
//! 3. `local.toml` (not committed)
//! 4. `FREELANCELOT_*` environment variables

pub mod environment;
pub mod error;
pub mod loader;
pub mod settings;
pub mod validation;

pub use environment::Environment;
pub use loader::ConfigLoader;
pub use settings::{
    AlertsConfig, ApifyConfig, DatabaseConfig, MatchScope, NotifierConfig, NotifierKind,
    PollerConfig, Settings, SourceConfig, SourceKind, StorageBackend, StorageConfig,
    TelegramConfig,
};
