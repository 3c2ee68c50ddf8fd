//! Command executor for dispatching CLI commands

use super::handlers::{
    CheckCommandHandler, MigrateCommandHandler, OnceCommandHandler, RunCommandHandler,
};
use super::parser::{Cli, Commands};
use crate::config::Settings;
use crate::error::{AppError, AppResult};

/// Execute a CLI command with merged and validated settings
///
/// # Errors
/// Returns errors from command handlers or argument validation failures
pub async fn execute_command(cli: &Cli, settings: Settings) -> AppResult<()> {
    cli.validate().map_err(|reason| AppError::Validation {
        field: "cli_arguments".to_string(),
        reason,
    })?;

    match cli.selected_command() {
        Commands::Run { .. } => RunCommandHandler::new(settings).execute().await,
        Commands::Once { .. } => OnceCommandHandler::new(settings).execute().await,
        Commands::Migrate { dry_run, rollback } => {
            MigrateCommandHandler::new(settings)
                .execute(dry_run, rollback)
                .await
        }
        Commands::Check => CheckCommandHandler::new(settings).execute(),
    }
}
