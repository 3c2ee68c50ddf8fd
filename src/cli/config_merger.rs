//! Configuration merger for CLI arguments and config files
//!
//! File and environment configuration is loaded first, then CLI overrides
//! are applied and the result is validated for the selected command.

use super::parser::{Cli, Commands};
use crate::config::error::ConfigError;
use crate::config::{ConfigLoader, NotifierKind, Settings};

/// Applies CLI overrides on top of file-based configuration.
pub struct ConfigurationMerger {
    base_config: Settings,
}

impl ConfigurationMerger {
    pub fn new(base_config: Settings) -> Self {
        Self { base_config }
    }

    /// Loads the unvalidated base configuration selected by `--config` and `--env`.
    ///
    /// # Errors
    /// Returns ConfigError if the files cannot be read or deserialized
    pub fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
        let loader = match cli.config {
            Some(ref path) => ConfigLoader::from_file(path),
            None => ConfigLoader::new()?,
        };

        let loader = match cli.env {
            Some(env) => loader.with_environment(env.into()),
            None => loader,
        };

        Ok(Self::new(loader.load_unvalidated()?))
    }

    /// Merge CLI arguments with base configuration, then validate.
    ///
    /// # Precedence (highest to lowest)
    /// 1. CLI arguments
    /// 2. `FREELANCELOT_*` environment variables
    /// 3. Configuration files
    pub fn merge_cli_args(&self, cli: &Cli) -> Result<Settings, ConfigError> {
        let mut config = self.base_config.clone();

        Self::apply_global_overrides(&mut config, cli);

        let command = cli.selected_command();
        Self::apply_command_overrides(&mut config, &command);
        Self::validate_for(&config, &command)?;

        Ok(config)
    }

    fn apply_global_overrides(config: &mut Settings, cli: &Cli) {
        if cli.verbose {
            config.logger.level = "debug".to_string();
        } else if cli.quiet {
            config.logger.level = "error".to_string();
        }
    }

    fn apply_command_overrides(config: &mut Settings, command: &Commands) {
        match command {
            Commands::Run { interval, dry_run } => {
                if let Some(seconds) = interval {
                    config.poller.interval_seconds = *seconds;
                }
                if *dry_run {
                    config.notifier.kind = NotifierKind::Log;
                }
            }
            Commands::Once { dry_run } => {
                if *dry_run {
                    config.notifier.kind = NotifierKind::Log;
                }
            }
            Commands::Migrate { .. } | Commands::Check => {}
        }
    }

    /// `migrate` only needs a database and a logger; everything else needs
    /// the whole pipeline configured.
    fn validate_for(config: &Settings, command: &Commands) -> Result<(), ConfigError> {
        match command {
            Commands::Migrate { .. } => {
                config.database.validate()?;
                config.logger.validate()
            }
            _ => config.validate(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn base_settings() -> Settings {
        let mut settings = Settings::default();
        settings.database.url = "postgres://localhost/freelancelot".to_string();
        settings.source.apify.token = "apify-token".to_string();
        settings.notifier.telegram.bot_token = "123:abc".to_string();
        settings
    }

    fn merge(args: &[&str], settings: Settings) -> Result<Settings, ConfigError> {
        let cli = Cli::try_parse_from(args).unwrap();
        ConfigurationMerger::new(settings).merge_cli_args(&cli)
    }

    #[test]
    fn test_no_overrides_keeps_base() {
        let merged = merge(&["freelancelot"], base_settings()).unwrap();
        assert_eq!(merged.poller.interval_seconds, base_settings().poller.interval_seconds);
        assert_eq!(merged.notifier.kind, NotifierKind::Telegram);
        assert_eq!(merged.logger.level, base_settings().logger.level);
    }

    #[test]
    fn test_verbose_and_quiet_set_log_level() {
        let merged = merge(&["freelancelot", "--verbose", "check"], base_settings()).unwrap();
        assert_eq!(merged.logger.level, "debug");

        let merged = merge(&["freelancelot", "--quiet", "check"], base_settings()).unwrap();
        assert_eq!(merged.logger.level, "error");
    }

    #[test]
    fn test_run_overrides_interval() {
        let merged = merge(&["freelancelot", "run", "--interval", "300"], base_settings()).unwrap();
        assert_eq!(merged.poller.interval_seconds, 300);
    }

    #[test]
    fn test_dry_run_switches_to_log_notifier() {
        let merged = merge(&["freelancelot", "once", "--dry-run"], base_settings()).unwrap();
        assert_eq!(merged.notifier.kind, NotifierKind::Log);

        let merged = merge(&["freelancelot", "run", "--dry-run"], base_settings()).unwrap();
        assert_eq!(merged.notifier.kind, NotifierKind::Log);
    }

    #[test]
    fn test_dry_run_does_not_need_bot_token() {
        let mut settings = base_settings();
        settings.notifier.telegram.bot_token = String::new();

        assert!(merge(&["freelancelot", "once"], settings.clone()).is_err());
        assert!(merge(&["freelancelot", "once", "--dry-run"], settings).is_ok());
    }

    #[test]
    fn test_migrate_only_validates_database() {
        let mut settings = base_settings();
        settings.source.apify.token = String::new();
        assert!(merge(&["freelancelot", "migrate"], settings.clone()).is_ok());

        settings.database.url = "mysql://localhost/db".to_string();
        let err = merge(&["freelancelot", "migrate"], settings).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError { ref field, .. } if field == "database.url"));
    }
}
