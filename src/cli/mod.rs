//! CLI module for freelancelot
//!
//! - Argument parsing with clap
//! - Configuration merging (CLI args + config files)
//! - Command handlers for run, once, migrate and check

pub mod config_merger;
pub mod executor;
pub mod handlers;
pub mod parser;
pub mod validation;

pub use config_merger::ConfigurationMerger;
pub use executor::execute_command;
pub use parser::{Cli, Commands, Environment};

use anyhow::Context;

use crate::config::Settings;
use crate::logger::init_logger;

/// Load configuration files, apply CLI overrides and validate the result.
///
/// # Errors
/// Returns error if configuration loading, merging, or validation fails
pub fn load_and_merge_config(cli: &Cli) -> anyhow::Result<Settings> {
    cli.validate().map_err(anyhow::Error::msg)?;

    let merger = ConfigurationMerger::from_cli(cli).context("Configuration error")?;
    merger
        .merge_cli_args(cli)
        .context("Configuration merge error")
}

/// Initialize logger from settings
///
/// # Errors
/// Returns error if the logger settings are invalid or a subscriber is already set
pub fn init_logger_from_settings(settings: &Settings) -> anyhow::Result<()> {
    let logger_config = settings
        .logger
        .clone()
        .into_logger_config()
        .context("Logger configuration error")?;

    init_logger(logger_config).context("Logger initialization error")
}
