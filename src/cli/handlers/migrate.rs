//! Migrate command handler
//!
//! Handles database migration operations including dry-run and rollback.

use crate::config::Settings;
use crate::db::{pending_migrations, revert_migrations, run_migrations};
use crate::error::{AppError, AppResult};

/// Handler for the migrate command
pub struct MigrateCommandHandler {
    config: Settings,
}

impl MigrateCommandHandler {
    pub fn new(config: Settings) -> Self {
        Self { config }
    }

    /// Execute the migrate command with dry-run and rollback support
    ///
    /// # Arguments
    /// * `dry_run` - If true, shows pending migrations without applying them
    /// * `rollback` - Optional number of migrations to revert
    ///
    /// # Errors
    /// - Database connection errors
    /// - Migration execution errors
    /// - Configuration validation errors
    pub async fn execute(&self, dry_run: bool, rollback: Option<u32>) -> AppResult<()> {
        self.config.database.validate()?;

        if dry_run {
            return self.show_pending_migrations().await;
        }

        match rollback {
            Some(steps) => self.rollback_migrations(steps).await,
            None => self.apply_migrations().await,
        }
    }

    async fn show_pending_migrations(&self) -> AppResult<()> {
        println!("Checking for pending migrations...");

        let pending = pending_migrations(&self.config.database.url).await?;

        if pending.is_empty() {
            println!("✓ No pending migrations found - database is up to date");
        } else {
            println!("Found {} pending migration(s):", pending.len());
            for migration in &pending {
                println!("  - {}", migration);
            }
            println!("\nRun without --dry-run to apply these migrations");
        }

        Ok(())
    }

    async fn apply_migrations(&self) -> AppResult<()> {
        println!("Running database migrations...");

        let applied = run_migrations(&self.config.database.url).await?;

        if applied.is_empty() {
            println!("✓ No migrations to apply - database is already up to date");
        } else {
            println!("✓ Applied {} migration(s):", applied.len());
            for migration in &applied {
                println!("  - {}", migration);
            }
        }

        Ok(())
    }

    async fn rollback_migrations(&self, steps: u32) -> AppResult<()> {
        if steps == 0 {
            return Err(AppError::Validation {
                field: "rollback_steps".to_string(),
                reason: "Number of rollback steps must be greater than 0".to_string(),
            });
        }

        println!("Rolling back {} migration(s)...", steps);

        let reverted = revert_migrations(&self.config.database.url, steps).await?;
        println!("✓ Rolled back {} migration(s)", reverted);

        Ok(())
    }

    pub fn config(&self) -> &Settings {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_valid_config() -> Settings {
        let mut config = Settings::default();
        config.database.url = "postgres://localhost/freelancelot_test".to_string();
        config
    }

    #[test]
    fn test_migrate_handler_new() {
        let config = create_valid_config();
        let handler = MigrateCommandHandler::new(config.clone());
        assert_eq!(handler.config(), &config);
    }

    #[tokio::test]
    async fn test_zero_rollback_steps_rejected() {
        let handler = MigrateCommandHandler::new(create_valid_config());

        match handler.execute(false, Some(0)).await {
            Err(AppError::Validation { field, reason }) => {
                assert_eq!(field, "rollback_steps");
                assert!(reason.contains("must be greater than 0"));
            }
            other => panic!("Expected validation error, got: {:?}", other.err()),
        }
    }

    #[tokio::test]
    async fn test_invalid_database_url_rejected_before_connecting() {
        let mut config = create_valid_config();
        config.database.url = "sqlite://local.db".to_string();
        let handler = MigrateCommandHandler::new(config);

        assert!(handler.execute(true, None).await.is_err());
    }
}
