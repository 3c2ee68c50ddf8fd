use std::future::Future;
use std::time::Duration;

use crate::error::{AppError, AppResult};

/// Runs `fut` under `limit`, mapping an elapsed deadline to [`AppError::Timeout`].
pub async fn bounded<T, F>(limit: Duration, operation: &str, fut: F) -> AppResult<T>
where
    F: Future<Output = AppResult<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(operation, seconds = limit.as_secs(), "Operation timed out");
            Err(AppError::Timeout {
                operation: operation.to_string(),
                seconds: limit.as_secs(),
            })
        }
    }
}
