//! CLI argument parsing with clap

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Freelance job alerts: polls a listing source and notifies subscribers
#[derive(Parser, Debug)]
#[command(name = "freelancelot")]
#[command(about = "Polls freelance job listings and alerts subscribers about matches")]
#[command(long_about = "
Freelancelot fetches new job listings on a fixed interval, stores the ones it
has not seen before, matches them against each subscriber's saved filters and
sends one alert per (subscriber, listing) pair, capped per subscriber per hour.

EXAMPLES:
    # Start polling with the layered configuration in ./config
    freelancelot run

    # Poll every two minutes, logging messages instead of sending them
    freelancelot run --interval 120 --dry-run

    # Execute a single cycle and print its report
    freelancelot once

    # Use a single configuration file
    freelancelot --config /etc/freelancelot/production.toml run

    # Apply, preview or roll back database migrations
    freelancelot migrate
    freelancelot migrate --dry-run
    freelancelot migrate --rollback 1

    # Validate configuration and exit
    freelancelot check
")]
#[command(version = crate::build::CLAP_LONG_VERSION)]
pub struct Cli {
    /// Subcommand to execute, `run` when omitted
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Configuration file path
    ///
    /// Use a single TOML file instead of the layered `config/` directory.
    /// `FREELANCELOT_*` environment variables still apply on top.
    #[arg(short, long, value_name = "FILE", value_parser = super::validation::validate_config_file_path)]
    pub config: Option<PathBuf>,

    /// Override environment detection
    ///
    /// Selects the `{environment}.toml` overlay instead of `FREELANCELOT_APP_ENV`.
    #[arg(short, long, value_enum)]
    pub env: Option<Environment>,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Only log errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Poll on a fixed interval until Ctrl+C or SIGTERM (default)
    Run {
        /// Poll interval in seconds, overrides `poller.interval_seconds`
        #[arg(long, value_name = "SECS", value_parser = super::validation::validate_interval)]
        interval: Option<u64>,

        /// Log alert messages instead of delivering them
        #[arg(long)]
        dry_run: bool,
    },
    /// Execute exactly one poll cycle and print its report
    Once {
        /// Log alert messages instead of delivering them
        #[arg(long)]
        dry_run: bool,
    },
    /// Database migration operations
    ///
    /// Examples:
    ///   freelancelot migrate                # Apply all pending migrations
    ///   freelancelot migrate --dry-run      # List pending migrations
    ///   freelancelot migrate --rollback 2   # Revert the last 2 migrations
    Migrate {
        /// Show pending migrations without applying
        #[arg(long, conflicts_with = "rollback")]
        dry_run: bool,

        /// Number of migrations to revert (1-100)
        #[arg(long, value_name = "STEPS", conflicts_with = "dry_run", value_parser = super::validation::validate_rollback_steps)]
        rollback: Option<u32>,
    },
    /// Validate configuration and exit
    Check,
}

impl Default for Commands {
    fn default() -> Self {
        Commands::Run {
            interval: None,
            dry_run: false,
        }
    }
}

/// Environment options
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Environment {
    #[value(name = "development", alias = "dev")]
    Development,
    #[value(name = "test")]
    Test,
    #[value(name = "staging", alias = "stage")]
    Staging,
    #[value(name = "production", alias = "prod")]
    Production,
}

impl Cli {
    /// The subcommand to run, defaulting to `run`.
    pub fn selected_command(&self) -> Commands {
        self.command.clone().unwrap_or_default()
    }

    /// Cross-argument checks clap does not express.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(Commands::Migrate {
            dry_run: true,
            rollback: Some(_),
        }) = self.command
        {
            return Err("Cannot use --dry-run and --rollback together".to_string());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use --verbose and --quiet together".to_string());
        }

        Ok(())
    }
}

impl From<Environment> for crate::config::Environment {
    fn from(env: Environment) -> Self {
        match env {
            Environment::Development => crate::config::Environment::Development,
            Environment::Test => crate::config::Environment::Test,
            Environment::Staging => crate::config::Environment::Staging,
            Environment::Production => crate::config::Environment::Production,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_version_flag() {
        let err = Cli::try_parse_from(["freelancelot", "--version"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }

    #[test]
    fn test_default_command_is_run() {
        let cli = Cli::try_parse_from(["freelancelot"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(
            cli.selected_command(),
            Commands::Run {
                interval: None,
                dry_run: false
            }
        );
    }

    #[test]
    fn test_run_command() {
        let cli = Cli::try_parse_from(["freelancelot", "run", "--interval", "120", "--dry-run"])
            .unwrap();
        assert_eq!(
            cli.selected_command(),
            Commands::Run {
                interval: Some(120),
                dry_run: true
            }
        );
    }

    #[test]
    fn test_run_interval_out_of_range() {
        let err = Cli::try_parse_from(["freelancelot", "run", "--interval", "5"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn test_once_and_check_commands() {
        let cli = Cli::try_parse_from(["freelancelot", "once", "--dry-run"]).unwrap();
        assert_eq!(cli.selected_command(), Commands::Once { dry_run: true });

        let cli = Cli::try_parse_from(["freelancelot", "check"]).unwrap();
        assert_eq!(cli.selected_command(), Commands::Check);
    }

    #[test]
    fn test_migrate_command() {
        let cli = Cli::try_parse_from(["freelancelot", "migrate", "--rollback", "2"]).unwrap();
        assert_eq!(
            cli.selected_command(),
            Commands::Migrate {
                dry_run: false,
                rollback: Some(2)
            }
        );

        let err = Cli::try_parse_from(["freelancelot", "migrate", "--dry-run", "--rollback", "1"])
            .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn test_env_aliases() {
        let cli = Cli::try_parse_from(["freelancelot", "--env", "prod", "check"]).unwrap();
        assert_eq!(cli.env, Some(Environment::Production));
    }

    #[test]
    fn test_conflicting_verbose_quiet() {
        let err = Cli::try_parse_from(["freelancelot", "--verbose", "--quiet"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }
}
