//! Configuration settings structures
//!
//! Every section deserialises with defaults so a minimal `default.toml`
//! only needs credentials and connection strings.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::config::error::ConfigError;
use crate::logger::{ConsoleConfig, FileConfig, LogFormat, LoggerConfig, RotationConfig};

// ============================================================================
// Default value functions
// ============================================================================

fn default_app_name() -> String {
    "freelancelot".to_string()
}

fn default_app_version() -> String {
    crate::pkg_version().to_string()
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

fn default_connection_timeout() -> u64 {
    30
}

fn default_operation_timeout() -> u64 {
    10
}

fn default_interval_seconds() -> u64 {
    60
}

fn default_lookback_minutes() -> i64 {
    10
}

fn default_cycle_timeout() -> u64 {
    300
}

fn default_window_minutes() -> i64 {
    60
}

fn default_max_per_window() -> u32 {
    10
}

fn default_max_listings_per_message() -> usize {
    5
}

fn default_delivery_timeout() -> u64 {
    15
}

fn default_apify_endpoint() -> String {
    "https://api.apify.com/v2/actor-tasks/vigorous_juggernaut~upwork-extractor-task/run-sync-get-dataset-items"
        .to_string()
}

fn default_apify_timeout() -> u64 {
    30
}

fn default_telegram_api_base() -> String {
    "https://api.telegram.org".to_string()
}

fn default_telegram_timeout() -> u64 {
    10
}

fn default_preview_length() -> usize {
    150
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_log_path() -> String {
    "logs/freelancelot.log".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_max_size() -> u64 {
    10 * 1024 * 1024
}

fn default_max_files() -> usize {
    5
}

// ============================================================================
// Application
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationConfig {
    #[serde(default = "default_app_name")]
    pub name: String,

    #[serde(default = "default_app_version")]
    pub version: String,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            version: default_app_version(),
        }
    }
}

// ============================================================================
// Database and storage
// ============================================================================

/// Diesel database connection configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL
    #[serde(default)]
    pub url: String,

    /// Maximum number of connections in the pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum number of idle connections kept in the pool
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Connection timeout in seconds
    #[serde(default = "default_connection_timeout")]
    pub connection_timeout: u64,

    /// Run pending migrations before the first cycle
    #[serde(default)]
    pub auto_migrate: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connection_timeout: default_connection_timeout(),
            auto_migrate: false,
        }
    }
}

/// Where listings and alert records are kept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Postgres,
    Memory,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,

    /// JSON file with subscribers and their filters, used by the memory backend
    #[serde(default)]
    pub subscribers_file: Option<String>,

    /// Upper bound in seconds for any single store read or write
    #[serde(default = "default_operation_timeout")]
    pub operation_timeout: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            subscribers_file: None,
            operation_timeout: default_operation_timeout(),
        }
    }
}

// ============================================================================
// Pipeline
// ============================================================================

/// Which listings the alert coordinator evaluates each cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MatchScope {
    /// Listings inserted by this cycle that are inside the lookback window
    Inserted,
    /// Every stored listing published inside the lookback window; work a
    /// failed cycle left undone is retried by the next one
    #[default]
    Lookback,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollerConfig {
    #[serde(default = "default_interval_seconds")]
    pub interval_seconds: u64,

    #[serde(default = "default_lookback_minutes")]
    pub lookback_minutes: i64,

    /// Run one cycle immediately instead of waiting for the first tick
    #[serde(default = "default_true")]
    pub run_on_start: bool,

    /// Hard ceiling in seconds for a whole cycle
    #[serde(default = "default_cycle_timeout")]
    pub cycle_timeout: u64,

    #[serde(default)]
    pub match_scope: MatchScope,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval_seconds: default_interval_seconds(),
            lookback_minutes: default_lookback_minutes(),
            run_on_start: true,
            cycle_timeout: default_cycle_timeout(),
            match_scope: MatchScope::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertsConfig {
    /// Trailing rate window in minutes
    #[serde(default = "default_window_minutes")]
    pub window_minutes: i64,

    /// Deliveries allowed per user inside the rate window
    #[serde(default = "default_max_per_window")]
    pub max_per_window: u32,

    #[serde(default = "default_max_listings_per_message")]
    pub max_listings_per_message: usize,

    /// Write an alert record even when delivery failed (no retry next cycle)
    #[serde(default = "default_true")]
    pub record_failed_deliveries: bool,

    #[serde(default = "default_delivery_timeout")]
    pub delivery_timeout: u64,
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            window_minutes: default_window_minutes(),
            max_per_window: default_max_per_window(),
            max_listings_per_message: default_max_listings_per_message(),
            record_failed_deliveries: true,
            delivery_timeout: default_delivery_timeout(),
        }
    }
}

// ============================================================================
// Collaborators
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[default]
    Apify,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApifyConfig {
    #[serde(default = "default_apify_endpoint")]
    pub endpoint: String,

    #[serde(default)]
    pub token: String,

    #[serde(default = "default_apify_timeout")]
    pub timeout_seconds: u64,
}

impl Default for ApifyConfig {
    fn default() -> Self {
        Self {
            endpoint: default_apify_endpoint(),
            token: String::new(),
            timeout_seconds: default_apify_timeout(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SourceConfig {
    #[serde(default)]
    pub kind: SourceKind,

    #[serde(default)]
    pub apify: ApifyConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NotifierKind {
    #[default]
    Telegram,
    /// Write formatted messages to the log instead of sending them
    Log,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelegramConfig {
    #[serde(default)]
    pub bot_token: String,

    #[serde(default = "default_telegram_api_base")]
    pub api_base: String,

    #[serde(default = "default_telegram_timeout")]
    pub timeout_seconds: u64,

    /// Description characters shown per listing
    #[serde(default = "default_preview_length")]
    pub preview_length: usize,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            api_base: default_telegram_api_base(),
            timeout_seconds: default_telegram_timeout(),
            preview_length: default_preview_length(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct NotifierConfig {
    #[serde(default)]
    pub kind: NotifierKind,

    #[serde(default)]
    pub telegram: TelegramConfig,
}

// ============================================================================
// Logger
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_true")]
    pub colored: bool,
}

impl Default for ConsoleSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            colored: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotationSettings {
    /// Maximum file size in bytes before rotation
    #[serde(default = "default_max_size")]
    pub max_size: u64,

    /// Rotated files kept next to the active one
    #[serde(default = "default_max_files")]
    pub max_files: usize,

    #[serde(default)]
    pub compress: bool,
}

impl Default for RotationSettings {
    fn default() -> Self {
        Self {
            max_size: default_max_size(),
            max_files: default_max_files(),
            compress: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSettings {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_log_path")]
    pub path: String,

    #[serde(default = "default_true")]
    pub append: bool,

    /// "full", "compact" or "json"
    #[serde(default = "default_log_format")]
    pub format: String,

    #[serde(default)]
    pub rotation: RotationSettings,
}

impl Default for FileSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            path: default_log_path(),
            append: true,
            format: default_log_format(),
            rotation: RotationSettings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggerSettings {
    /// Level or full `EnvFilter` directive
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub console: ConsoleSettings,

    #[serde(default)]
    pub file: FileSettings,
}

impl Default for LoggerSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            console: ConsoleSettings::default(),
            file: FileSettings::default(),
        }
    }
}

impl LoggerSettings {
    /// Converts the file representation into the runtime logger config.
    pub fn into_logger_config(self) -> Result<LoggerConfig, ConfigError> {
        let format = self.file.format.parse::<LogFormat>().map_err(|e| {
            ConfigError::validation("logger.file.format".to_string(), e.to_string())
        })?;

        let rotation = RotationConfig::new(
            self.file.rotation.max_size,
            self.file.rotation.max_files,
            self.file.rotation.compress,
        )
        .map_err(|e| ConfigError::validation("logger.file.rotation".to_string(), e.to_string()))?;

        let file = FileConfig {
            enabled: self.file.enabled,
            path: PathBuf::from(self.file.path),
            append: self.file.append,
            format,
            rotation,
        };

        let console = ConsoleConfig {
            enabled: self.console.enabled,
            colored: self.console.colored,
        };

        LoggerConfig::new(console, file, self.level)
            .map_err(|e| ConfigError::validation("logger".to_string(), e.to_string()))
    }
}

// ============================================================================
// Root
// ============================================================================

/// Complete application settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub application: ApplicationConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub poller: PollerConfig,

    #[serde(default)]
    pub alerts: AlertsConfig,

    #[serde(default)]
    pub source: SourceConfig,

    #[serde(default)]
    pub notifier: NotifierConfig,

    #[serde(default)]
    pub logger: LoggerSettings,
}
