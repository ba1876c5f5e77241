//! Common library for the user records service
//!
//! This crate provides shared functionality used by the services in the
//! workspace: PostgreSQL connectivity, migrations and storage error
//! classification.
//!
//! ```rust,no_run
//! use common::database::{DatabaseConfig, health_check, init_pool};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = DatabaseConfig::from_env()?;
//!     let pool = init_pool(&config).await?;
//!     println!("Database health check: {}", health_check(&pool).await);
//!     Ok(())
//! }
//! ```

pub mod database;
pub mod error;
