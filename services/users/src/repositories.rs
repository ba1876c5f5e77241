//! Repositories for user persistence

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::error::DatabaseError;
use thiserror::Error;
use uuid::Uuid;

use crate::{
    models::{ListSpec, NewUser, UserChanges, UserRecord, UserStats},
    validation::FieldErrors,
};

#[cfg(test)]
pub mod memory;
pub mod postgres;

pub use postgres::PgUserRepository;

const EDAD_CHECK: &str = "usuarios_edad_check";

/// Errors surfaced by a repository
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// Values failed the write-time validation
    #[error("Validation failed: {0:?}")]
    Validation(FieldErrors),

    /// A unique field collides with an existing record
    #[error("Duplicate value for {field}")]
    Duplicate { field: &'static str },

    #[error(transparent)]
    Database(DatabaseError),
}

impl From<DatabaseError> for RepositoryError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::UniqueViolation { constraint } => RepositoryError::Duplicate {
                field: if constraint.contains("email") { "email" } else { "id" },
            },
            DatabaseError::CheckViolation { constraint } if constraint == EDAD_CHECK => {
                let mut errors = FieldErrors::new();
                errors.insert(
                    "edad",
                    "La edad debe estar entre 18 y 100 años".to_string(),
                );
                RepositoryError::Validation(errors)
            }
            other => RepositoryError::Database(other),
        }
    }
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        DatabaseError::from_query(err).into()
    }
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Persistence operations on the user collection
///
/// Implementations validate values again right before writing and enforce
/// email uniqueness themselves; callers' pre-checks are advisory.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// One page of records matching the spec, plus the total match count
    async fn list(&self, spec: &ListSpec) -> RepositoryResult<(Vec<UserRecord>, u64)>;

    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<UserRecord>>;

    /// Record using this (normalized) email, ignoring `exclude`
    async fn find_by_email(
        &self,
        email: &str,
        exclude: Option<Uuid>,
    ) -> RepositoryResult<Option<UserRecord>>;

    /// Insert a new record; id and timestamps are assigned here
    async fn create(&self, user: &NewUser) -> RepositoryResult<UserRecord>;

    /// Apply a change set; `None` when the id does not exist
    async fn update(&self, id: Uuid, changes: &UserChanges)
    -> RepositoryResult<Option<UserRecord>>;

    /// Hard delete; returns the removed record
    async fn delete(&self, id: Uuid) -> RepositoryResult<Option<UserRecord>>;

    /// Aggregates over the whole collection; `recent_since` bounds "recent"
    async fn stats(&self, recent_since: DateTime<Utc>) -> RepositoryResult<UserStats>;

    /// Whether the storage backend is reachable
    async fn ping(&self) -> bool;
}
