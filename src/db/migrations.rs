//! Embedded migrations, executed on a blocking `PgConnection`.

use diesel::Connection;
use diesel::pg::PgConnection;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};

use crate::error::{AppError, AppResult};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Applies pending migrations and returns their names.
pub async fn run_migrations(database_url: &str) -> AppResult<Vec<String>> {
    with_connection(database_url, |conn| {
        let applied = conn
            .run_pending_migrations(MIGRATIONS)
            .map_err(|e| migration_error("run pending migrations", e))?;
        Ok(applied.iter().map(ToString::to_string).collect())
    })
    .await
}

/// Names of migrations not yet applied.
pub async fn pending_migrations(database_url: &str) -> AppResult<Vec<String>> {
    with_connection(database_url, |conn| {
        let pending = conn
            .pending_migrations(MIGRATIONS)
            .map_err(|e| migration_error("check pending migrations", e))?;
        Ok(pending.iter().map(|m| m.name().to_string()).collect())
    })
    .await
}

/// Reverts the last `steps` migrations and returns how many were reverted.
pub async fn revert_migrations(database_url: &str, steps: u32) -> AppResult<usize> {
    if steps == 0 {
        return Err(AppError::Validation {
            field: "rollback_steps".to_string(),
            reason: "Number of rollback steps must be greater than 0".to_string(),
        });
    }

    with_connection(database_url, move |conn| {
        let applied = conn
            .applied_migrations()
            .map_err(|e| migration_error("get applied migrations", e))?;

        if applied.len() < steps as usize {
            return Err(AppError::Validation {
                field: "rollback_steps".to_string(),
                reason: format!(
                    "Cannot rollback {} migrations - only {} applied migrations available",
                    steps,
                    applied.len()
                ),
            });
        }

        for _ in 0..steps {
            conn.revert_last_migration(MIGRATIONS)
                .map_err(|e| migration_error("revert migration", e))?;
        }
        Ok(steps as usize)
    })
    .await
}

async fn with_connection<T, F>(database_url: &str, op: F) -> AppResult<T>
where
    T: Send + 'static,
    F: FnOnce(&mut PgConnection) -> AppResult<T> + Send + 'static,
{
    let database_url = database_url.to_string();
    tokio::task::spawn_blocking(move || {
        let mut conn =
            PgConnection::establish(&database_url).map_err(|e| AppError::Database {
                operation: "establish connection for migrations".to_string(),
                source: anyhow::Error::from(e),
            })?;
        op(&mut conn)
    })
    .await
    .map_err(|e| AppError::Internal {
        source: anyhow::Error::from(e),
    })?
}

fn migration_error(
    operation: &str,
    error: Box<dyn std::error::Error + Send + Sync>,
) -> AppError {
    AppError::Database {
        operation: operation.to_string(),
        source: anyhow::anyhow!("Migration error: {}", error),
    }
}
