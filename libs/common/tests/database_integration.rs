//! Integration tests for the database plumbing
//!
//! These tests need a reachable PostgreSQL instance (see `DATABASE_URL`) and
//! are ignored by default. Run them with `cargo test -- --ignored`.

use common::{
    database::{DatabaseConfig, health_check, init_pool},
    error::DatabaseError,
};
use sqlx::Row;

#[tokio::test]
#[ignore = "requires a running PostgreSQL instance"]
async fn test_database_connectivity() -> Result<(), Box<dyn std::error::Error>> {
    let db_config = DatabaseConfig::from_env()?;
    let pool = init_pool(&db_config).await?;

    assert!(health_check(&pool).await, "Database health check failed");

    let row = sqlx::query("SELECT 1 as result").fetch_one(&pool).await?;
    let result: i32 = row.get("result");
    assert_eq!(result, 1, "PostgreSQL simple query test failed");

    Ok(())
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL instance"]
async fn test_unique_violation_is_classified() -> Result<(), Box<dyn std::error::Error>> {
    let db_config = DatabaseConfig::from_env()?;
    let pool = init_pool(&db_config).await?;

    let mut tx = pool.begin().await?;
    sqlx::query("CREATE TEMP TABLE scratch_emails (email TEXT CONSTRAINT scratch_emails_email_key UNIQUE)")
        .execute(&mut *tx)
        .await?;
    sqlx::query("INSERT INTO scratch_emails (email) VALUES ('a@b.co')")
        .execute(&mut *tx)
        .await?;

    let err = sqlx::query("INSERT INTO scratch_emails (email) VALUES ('a@b.co')")
        .execute(&mut *tx)
        .await
        .map_err(DatabaseError::from_query)
        .expect_err("duplicate insert should fail");

    match err {
        DatabaseError::UniqueViolation { constraint } => {
            assert_eq!(constraint, "scratch_emails_email_key")
        }
        other => panic!("unexpected error: {other}"),
    }

    Ok(())
}
