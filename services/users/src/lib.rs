//! User records service
//!
//! JSON API over a PostgreSQL `usuarios` table: CRUD, paginated listing and
//! aggregate statistics.

use sqlx::migrate::Migrator;

pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod rate_limiter;
pub mod repositories;
pub mod routes;
pub mod state;
pub mod validation;

/// Embedded schema migrations for the `usuarios` table
pub static MIGRATOR: Migrator = sqlx::migrate!();
