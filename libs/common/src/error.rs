//! Custom error types for the common library
//!
//! This module defines the storage error type shared by the services and the
//! helpers that classify raw `sqlx` failures.

use sqlx::Error as SqlxError;
use thiserror::Error;

/// Custom error type for database operations
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Error occurred during database connection
    #[error("Database connection error: {0}")]
    Connection(#[source] SqlxError),

    /// Error occurred during database query execution
    #[error("Database query error: {0}")]
    Query(#[source] SqlxError),

    /// A write collided with a unique index
    #[error("Unique constraint violated: {constraint}")]
    UniqueViolation { constraint: String },

    /// A write was rejected by a CHECK constraint
    #[error("Check constraint violated: {constraint}")]
    CheckViolation { constraint: String },

    /// Error occurred during database migration
    #[error("Database migration error: {0}")]
    Migration(String),

    /// Configuration error
    #[error("Database configuration error: {0}")]
    Configuration(String),
}

impl DatabaseError {
    /// Classify an error returned by a query.
    ///
    /// Constraint violations reported by the server are split out so callers
    /// can turn them into client errors; everything else stays a `Query`.
    pub fn from_query(err: SqlxError) -> Self {
        if let Some(db_err) = err.as_database_error() {
            let constraint = db_err.constraint().unwrap_or_default().to_string();
            if db_err.is_unique_violation() {
                return DatabaseError::UniqueViolation { constraint };
            }
            if db_err.is_check_violation() {
                return DatabaseError::CheckViolation { constraint };
            }
        }
        DatabaseError::Query(err)
    }
}

impl From<SqlxError> for DatabaseError {
    fn from(err: SqlxError) -> Self {
        DatabaseError::from_query(err)
    }
}

/// Type alias for Result with DatabaseError
pub type DatabaseResult<T> = Result<T, DatabaseError>;
