use crate::error::DatabaseErrorConverter;
use thiserror::Error;

/// Application-wide error type covering the ingest, match and notify pipeline.
///
/// Variants carry structured context so the poller can decide whether a
/// failure only affects one item or should end the current cycle.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found error with entity, field, and value information
    #[error("Resource not found: {entity} with {field}={value}")]
    NotFound {
        entity: String,
        field: String,
        value: String,
    },

    /// Duplicate entry error for unique constraint violations
    #[error("Duplicate entry: {entity}.{field} = '{value}' already exists")]
    Duplicate {
        entity: String,
        field: String,
        value: String,
    },

    /// Validation error with field-specific details
    #[error("Validation failed for {field}: {reason}")]
    Validation { field: String, reason: String },

    /// A raw listing that cannot be persisted (missing title, url, ...)
    #[error("Malformed listing: {field} {reason}")]
    MalformedListing { field: String, reason: String },

    /// The listing source could not be reached or returned garbage
    #[error("Listing source unavailable: {message}")]
    SourceUnavailable { message: String },

    /// Database operation error with operation context
    #[error("Database operation failed: {operation}")]
    Database {
        operation: String,
        #[source]
        source: anyhow::Error,
    },

    /// Connection pool error
    #[error("Connection pool error")]
    ConnectionPool {
        #[source]
        source: anyhow::Error,
    },

    /// An external call exceeded its time budget
    #[error("Operation '{operation}' timed out after {seconds}s")]
    Timeout { operation: String, seconds: u64 },

    /// Notification transport failure
    #[error("Delivery via {channel} failed: {message}")]
    Delivery { channel: String, message: String },

    /// Configuration error with key information
    #[error("Configuration error: {key}")]
    Configuration {
        key: String,
        #[source]
        source: anyhow::Error,
    },

    /// Internal error for unexpected failures
    #[error("Internal error")]
    Internal {
        #[source]
        source: anyhow::Error,
    },
}

impl AppError {
    /// True when the backing store is unreachable or too slow to answer.
    ///
    /// The pipeline aborts the rest of a cycle on these errors and keeps
    /// going on anything else.
    pub fn is_storage_unavailable(&self) -> bool {
        matches!(
            self,
            AppError::Database { .. } | AppError::ConnectionPool { .. } | AppError::Timeout { .. }
        )
    }
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        AppError::Internal { source: error }
    }
}

impl From<diesel::result::Error> for AppError {
    fn from(error: diesel::result::Error) -> Self {
        DatabaseErrorConverter::convert_diesel_error(error, "database operation")
    }
}

impl From<crate::config::error::ConfigError> for AppError {
    fn from(error: crate::config::error::ConfigError) -> Self {
        let key = match &error {
            crate::config::error::ConfigError::ValidationError { field, .. } => field.clone(),
            _ => "settings".to_string(),
        };
        AppError::Configuration {
            key,
            source: anyhow::Error::from(error),
        }
    }
}

/// Type alias for Result with AppError to simplify function signatures
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_unavailable_classification() {
        let db = AppError::Database {
            operation: "insert listing".to_string(),
            source: anyhow::anyhow!("connection reset"),
        };
        assert!(db.is_storage_unavailable());

        let timeout = AppError::Timeout {
            operation: "count alerts".to_string(),
            seconds: 10,
        };
        assert!(timeout.is_storage_unavailable());

        let malformed = AppError::MalformedListing {
            field: "url".to_string(),
            reason: "is missing".to_string(),
        };
        assert!(!malformed.is_storage_unavailable());

        let duplicate = AppError::Duplicate {
            entity: "listings".to_string(),
            field: "id".to_string(),
            value: "01abc".to_string(),
        };
        assert!(!duplicate.is_storage_unavailable());
    }

    #[test]
    fn test_config_error_keeps_field_as_key() {
        let err: AppError =
            crate::config::error::ConfigError::validation("poller.interval_seconds", "too small")
                .into();
        match err {
            AppError::Configuration { key, .. } => assert_eq!(key, "poller.interval_seconds"),
            other => panic!("Expected Configuration error, got: {:?}", other),
        }
    }
}
