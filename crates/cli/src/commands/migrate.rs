//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! ord-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `ORDERING_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string
//!
//! Migrations live in `crates/service/migrations/`.

use thiserror::Error;

/// Errors that can occur while migrating.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A migration failed to apply.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Apply every pending migration.
///
/// # Errors
///
/// Returns `MigrationError` if the database is unreachable or a migration fails.
pub async fn run() -> Result<(), MigrationError> {
    let database_url = super::database_url().map_err(MigrationError::MissingEnvVar)?;
    let pool = super::connect(&database_url).await?;

    tracing::info!("Running ordering migrations...");
    sqlx::migrate!("../service/migrations").run(&pool).await?;

    tracing::info!("Ordering migrations complete!");
    Ok(())
}
