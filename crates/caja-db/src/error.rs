//! Storage and service errors.
//!
//! `sqlx::Error` is folded into [`DbError`] here so callers can match on
//! constraint failures without parsing SQLite messages. Services return
//! [`ServiceError`], which also carries business-rule rejections; the HTTP
//! layer turns that into a status code.

use caja_core::password::PasswordError;
use caja_core::{CoreError, ValidationError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// `field` is `table.column` as SQLite names it, e.g. `products.code`.
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// A FOREIGN KEY or CHECK constraint rejected the write.
    #[error("Constraint failed: {0}")]
    Constraint(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    /// True when this is a unique violation on `table.column`.
    pub fn is_unique_violation_on(&self, column: &str) -> bool {
        matches!(self, DbError::UniqueViolation { field, .. } if field == column)
    }

    /// Fills in the offending value of a unique violation, which SQLite
    /// does not report.
    pub fn with_value(self, value: impl Into<String>) -> Self {
        match self {
            DbError::UniqueViolation { field, .. } => DbError::UniqueViolation {
                field,
                value: value.into(),
            },
            other => other,
        }
    }
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Self::not_found("Record", "unknown"),
            sqlx::Error::Database(db_err) => classify(db_err.message()),
            sqlx::Error::PoolTimedOut => {
                Self::ConnectionFailed("timed out waiting for a pooled connection".into())
            }
            sqlx::Error::PoolClosed => Self::ConnectionFailed("pool closed".into()),
            other => Self::Internal(other.to_string()),
        }
    }
}

/// Sorts a SQLite error message into a constraint kind.
fn classify(message: &str) -> DbError {
    if let Some(column) = message.strip_prefix("UNIQUE constraint failed: ") {
        DbError::duplicate(column, "unknown")
    } else if message.contains("FOREIGN KEY constraint failed")
        || message.contains("CHECK constraint failed")
    {
        DbError::Constraint(message.to_owned())
    } else {
        DbError::QueryFailed(message.to_owned())
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

pub type DbResult<T> = Result<T, DbError>;

/// Error returned by the workflow, account and report services: either a
/// business rule said no, or storage failed.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Db(#[from] DbError),

    #[error(transparent)]
    Password(#[from] PasswordError),
}

impl From<sqlx::Error> for ServiceError {
    fn from(err: sqlx::Error) -> Self {
        ServiceError::Db(err.into())
    }
}

impl From<ValidationError> for ServiceError {
    fn from(err: ValidationError) -> Self {
        ServiceError::Core(err.into())
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_violation_carries_column_and_value() {
        let err = DbError::duplicate("products.code", "unknown").with_value("COCA-500");
        assert!(err.is_unique_violation_on("products.code"));
        assert!(!err.is_unique_violation_on("users.email"));
        assert_eq!(
            err.to_string(),
            "Duplicate products.code: 'COCA-500' already exists"
        );
    }

    #[test]
    fn sqlite_messages_are_classified() {
        assert!(classify("UNIQUE constraint failed: sales.invoice_number")
            .is_unique_violation_on("sales.invoice_number"));
        assert!(matches!(
            classify("CHECK constraint failed: stock >= 0"),
            DbError::Constraint(_)
        ));
        assert!(matches!(classify("database is locked"), DbError::QueryFailed(_)));
    }

    #[test]
    fn validation_failure_becomes_core_error() {
        let err: ServiceError = ValidationError::Required {
            field: "code".to_string(),
        }
        .into();
        assert!(matches!(err, ServiceError::Core(CoreError::Validation(_))));
    }
}
