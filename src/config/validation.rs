//! Configuration validation logic
//!
//! Each section validates itself; `Settings::validate` also checks the
//! cross-section rules (credentials for the selected collaborators).

use crate::config::error::ConfigError;
use crate::config::settings::{
    AlertsConfig, ApifyConfig, DatabaseConfig, FileSettings, LoggerSettings, NotifierKind,
    PollerConfig, Settings, StorageBackend, StorageConfig, TelegramConfig,
};

const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

const VALID_LOG_FORMATS: &[&str] = &["full", "compact", "json"];

/// Accepted poll interval in seconds
const INTERVAL_RANGE: std::ops::RangeInclusive<u64> = 10..=3600;

impl DatabaseConfig {
    /// Validate database configuration
    ///
    /// # Validation Rules
    /// - URL must be a PostgreSQL connection string
    /// - Pool bounds must be positive and `min <= max`
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.url.is_empty() {
            return Err(ConfigError::validation(
                "database.url",
                "Database URL is required for the postgres storage backend.",
            ));
        }

        if !self.url.starts_with("postgres://") && !self.url.starts_with("postgresql://") {
            return Err(ConfigError::validation(
                "database.url",
                "Invalid database URL format. Expected postgres://[user:password@]host[:port]/database",
            ));
        }

        if self.max_connections == 0 {
            return Err(ConfigError::validation(
                "database.max_connections",
                "Max connections must be greater than 0.",
            ));
        }

        if self.min_connections == 0 {
            return Err(ConfigError::validation(
                "database.min_connections",
                "Min connections must be greater than 0.",
            ));
        }

        if self.min_connections > self.max_connections {
            return Err(ConfigError::ValidationError {
                field: "database.min_connections".to_string(),
                message: format!(
                    "Min connections ({}) cannot exceed max connections ({}).",
                    self.min_connections, self.max_connections
                ),
            });
        }

        if self.connection_timeout == 0 {
            return Err(ConfigError::validation(
                "database.connection_timeout",
                "Connection timeout must be greater than 0 seconds.",
            ));
        }

        Ok(())
    }
}

impl StorageConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.operation_timeout == 0 {
            return Err(ConfigError::validation(
                "storage.operation_timeout",
                "Store operation timeout must be greater than 0 seconds.",
            ));
        }

        if self.backend == StorageBackend::Memory
            && self
                .subscribers_file
                .as_deref()
                .map(str::trim)
                .unwrap_or_default()
                .is_empty()
        {
            return Err(ConfigError::validation(
                "storage.subscribers_file",
                "A subscribers file is required when the memory backend is selected.",
            ));
        }

        Ok(())
    }
}

impl PollerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !INTERVAL_RANGE.contains(&self.interval_seconds) {
            return Err(ConfigError::ValidationError {
                field: "poller.interval_seconds".to_string(),
                message: format!(
                    "Interval must be between {} and {} seconds, got {}.",
                    INTERVAL_RANGE.start(),
                    INTERVAL_RANGE.end(),
                    self.interval_seconds
                ),
            });
        }

        if self.lookback_minutes <= 0 {
            return Err(ConfigError::validation(
                "poller.lookback_minutes",
                "Lookback window must be greater than 0 minutes.",
            ));
        }

        if self.cycle_timeout == 0 {
            return Err(ConfigError::validation(
                "poller.cycle_timeout",
                "Cycle timeout must be greater than 0 seconds.",
            ));
        }

        Ok(())
    }
}

impl AlertsConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window_minutes <= 0 {
            return Err(ConfigError::validation(
                "alerts.window_minutes",
                "Rate window must be greater than 0 minutes.",
            ));
        }

        if self.max_per_window == 0 {
            return Err(ConfigError::validation(
                "alerts.max_per_window",
                "Rate cap must allow at least one delivery per window.",
            ));
        }

        if self.max_listings_per_message == 0 {
            return Err(ConfigError::validation(
                "alerts.max_listings_per_message",
                "A message must carry at least one listing.",
            ));
        }

        if self.delivery_timeout == 0 {
            return Err(ConfigError::validation(
                "alerts.delivery_timeout",
                "Delivery timeout must be greater than 0 seconds.",
            ));
        }

        Ok(())
    }
}

impl ApifyConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.endpoint.starts_with("http://") && !self.endpoint.starts_with("https://") {
            return Err(ConfigError::validation(
                "source.apify.endpoint",
                "Endpoint must be an http(s) URL.",
            ));
        }

        if self.token.trim().is_empty() {
            return Err(ConfigError::validation(
                "source.apify.token",
                "An Apify API token is required.",
            ));
        }

        if self.timeout_seconds == 0 {
            return Err(ConfigError::validation(
                "source.apify.timeout_seconds",
                "Source timeout must be greater than 0 seconds.",
            ));
        }

        Ok(())
    }
}

impl TelegramConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bot_token.trim().is_empty() {
            return Err(ConfigError::validation(
                "notifier.telegram.bot_token",
                "A bot token is required for the telegram notifier.",
            ));
        }

        if !self.api_base.starts_with("http://") && !self.api_base.starts_with("https://") {
            return Err(ConfigError::validation(
                "notifier.telegram.api_base",
                "API base must be an http(s) URL.",
            ));
        }

        if self.timeout_seconds == 0 {
            return Err(ConfigError::validation(
                "notifier.telegram.timeout_seconds",
                "Notifier timeout must be greater than 0 seconds.",
            ));
        }

        Ok(())
    }
}

impl FileSettings {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.enabled && self.path.trim().is_empty() {
            return Err(ConfigError::validation(
                "logger.file.path",
                "File path is required when file logging is enabled.",
            ));
        }

        if !VALID_LOG_FORMATS.contains(&self.format.to_lowercase().as_str()) {
            return Err(ConfigError::ValidationError {
                field: "logger.file.format".to_string(),
                message: format!(
                    "Invalid log format '{}'. Valid formats are: {}",
                    self.format,
                    VALID_LOG_FORMATS.join(", ")
                ),
            });
        }

        if self.rotation.max_size == 0 || self.rotation.max_files == 0 {
            return Err(ConfigError::validation(
                "logger.file.rotation",
                "Rotation max_size and max_files must be greater than 0.",
            ));
        }

        Ok(())
    }
}

impl LoggerSettings {
    /// Accepts a plain level or an `EnvFilter` directive such as
    /// `info,freelancelot=debug`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let base = self
            .level
            .split(',')
            .find(|directive| !directive.contains('='))
            .unwrap_or("info")
            .trim()
            .to_lowercase();

        if !base.is_empty() && !VALID_LOG_LEVELS.contains(&base.as_str()) {
            return Err(ConfigError::ValidationError {
                field: "logger.level".to_string(),
                message: format!(
                    "Invalid log level '{}'. Valid levels are: {}",
                    self.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }

        if !self.console.enabled && !self.file.enabled {
            return Err(ConfigError::validation(
                "logger",
                "At least one output (console or file) must be enabled.",
            ));
        }

        self.file.validate()
    }
}

impl Settings {
    /// Validates every section plus the rules that span sections.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.storage.validate()?;
        if self.storage.backend == StorageBackend::Postgres {
            self.database.validate()?;
        }

        self.poller.validate()?;
        self.alerts.validate()?;
        self.source.apify.validate()?;

        if self.notifier.kind == NotifierKind::Telegram {
            self.notifier.telegram.validate()?;
        }

        self.logger.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::settings::MatchScope;
    use proptest::prelude::*;

    fn valid_settings() -> Settings {
        let mut settings = Settings::default();
        settings.database.url = "postgres://localhost/freelancelot".to_string();
        settings.source.apify.token = "apify-token".to_string();
        settings.notifier.telegram.bot_token = "123:abc".to_string();
        settings
    }

    fn field_of(result: Result<(), ConfigError>) -> String {
        match result {
            Err(ConfigError::ValidationError { field, .. }) => field,
            other => panic!("Expected validation error, got: {:?}", other),
        }
    }

    #[test]
    fn test_valid_settings_pass() {
        assert!(valid_settings().validate().is_ok());
    }

    #[test]
    fn test_database_url_scheme() {
        let mut settings = valid_settings();
        settings.database.url = "mysql://localhost/db".to_string();
        assert_eq!(field_of(settings.validate()), "database.url");
    }

    #[test]
    fn test_memory_backend_skips_database_but_needs_subscribers() {
        let mut settings = valid_settings();
        settings.database.url = String::new();
        settings.storage.backend = StorageBackend::Memory;
        assert_eq!(field_of(settings.validate()), "storage.subscribers_file");

        settings.storage.subscribers_file = Some("subscribers.json".to_string());
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_log_notifier_needs_no_bot_token() {
        let mut settings = valid_settings();
        settings.notifier.telegram.bot_token = String::new();
        assert_eq!(field_of(settings.validate()), "notifier.telegram.bot_token");

        settings.notifier.kind = NotifierKind::Log;
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_apify_token_required() {
        let mut settings = valid_settings();
        settings.source.apify.token = "  ".to_string();
        assert_eq!(field_of(settings.validate()), "source.apify.token");
    }

    #[test]
    fn test_zero_rate_cap_rejected() {
        let mut settings = valid_settings();
        settings.alerts.max_per_window = 0;
        assert_eq!(field_of(settings.validate()), "alerts.max_per_window");
    }

    #[test]
    fn test_logger_directive_levels() {
        let mut settings = valid_settings();
        settings.logger.level = "warn,freelancelot=debug".to_string();
        assert!(settings.validate().is_ok());

        settings.logger.level = "loud".to_string();
        assert_eq!(field_of(settings.validate()), "logger.level");
    }

    proptest! {
        #[test]
        fn property_interval_range_enforced(interval in 0u64..10_000) {
            let mut settings = valid_settings();
            settings.poller.interval_seconds = interval;
            settings.poller.match_scope = MatchScope::Lookback;

            let accepted = settings.validate().is_ok();
            prop_assert_eq!(accepted, (10..=3600).contains(&interval));
        }
    }
}
