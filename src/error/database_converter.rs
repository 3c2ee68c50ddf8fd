use crate::error::{AppError, ConstraintParser};
use diesel::result::{DatabaseErrorKind, Error as DieselError};

/// Utility for converting database errors to structured AppError variants.
///
/// Unique violations become [`AppError::Duplicate`] so stores can treat a
/// racing insert of the same listing or alert as "already exists".
pub struct DatabaseErrorConverter;

impl DatabaseErrorConverter {
    /// Converts a Diesel error to an appropriate AppError variant.
    pub fn convert_diesel_error(error: DieselError, operation: &str) -> AppError {
        match error {
            DieselError::DatabaseError(kind, info) => {
                Self::convert_database_error(kind, info, operation)
            }
            DieselError::NotFound => AppError::NotFound {
                entity: "resource".to_string(),
                field: "id".to_string(),
                value: "unknown".to_string(),
            },
            other => AppError::Database {
                operation: operation.to_string(),
                source: anyhow::Error::from(other),
            },
        }
    }

    fn convert_database_error(
        kind: DatabaseErrorKind,
        info: Box<dyn diesel::result::DatabaseErrorInformation + Send + Sync>,
        operation: &str,
    ) -> AppError {
        let message = info.message();
        let constraint_name = info.constraint_name();

        match kind {
            DatabaseErrorKind::UniqueViolation => {
                match ConstraintParser::parse_unique_violation(message, constraint_name) {
                    Some((entity, field, value)) => AppError::Duplicate {
                        entity,
                        field,
                        value,
                    },
                    None => Self::opaque(operation, "Unique constraint violation", message),
                }
            }
            DatabaseErrorKind::NotNullViolation
            | DatabaseErrorKind::CheckViolation
            | DatabaseErrorKind::ForeignKeyViolation => {
                match ConstraintParser::parse_field_violation(message, constraint_name) {
                    Some((entity, field)) => AppError::Validation {
                        field,
                        reason: format!("{} rejected by {:?} on {}", operation, kind, entity),
                    },
                    None => Self::opaque(operation, "Constraint violation", message),
                }
            }
            DatabaseErrorKind::ClosedConnection => AppError::ConnectionPool {
                source: anyhow::Error::msg(format!("Connection closed: {}", message)),
            },
            _ => Self::opaque(operation, "Database error", message),
        }
    }

    fn opaque(operation: &str, label: &str, message: &str) -> AppError {
        AppError::Database {
            operation: operation.to_string(),
            source: anyhow::Error::msg(format!("{}: {}", label, message)),
        }
    }
}
