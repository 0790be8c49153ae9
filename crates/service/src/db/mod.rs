//! Database operations for the ordering `PostgreSQL` database.
//!
//! ## Tables
//!
//! - `users` - Buyer and shop accounts
//! - `addresses`, `contacts` - Delivery details attached to orders
//! - `shops`, `categories`, `shop_categories`, `products`, `product_infos`,
//!   `parameters`, `product_parameters` - Catalog populated by imports
//! - `orders`, `order_items` - Baskets and placed orders
//! - `tower_sessions.session` - Tower-sessions storage
//!
//! Queries are built at runtime with `sqlx::query_as` and `FromRow` rows.
//! Repositories own a pool reference for single-statement work; steps that
//! must share a transaction are free functions taking `&mut PgConnection`.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/service/migrations/` and run via:
//! ```bash
//! cargo run -p ordering-cli -- migrate
//! ```

pub mod catalog;
pub mod contacts;
pub mod orders;
pub mod users;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Map a unique violation to `Conflict`, anything else to `Database`.
    pub(crate) fn conflict_on_unique(err: sqlx::Error, message: &str) -> Self {
        Self::conflict_on_constraint(err, |_| message.to_owned())
    }

    /// Map a unique violation to `Conflict` with a message chosen from the
    /// violated constraint's name, anything else to `Database`.
    pub(crate) fn conflict_on_constraint(
        err: sqlx::Error,
        message: impl FnOnce(Option<&str>) -> String,
    ) -> Self {
        if let sqlx::Error::Database(ref db_err) = err
            && db_err.is_unique_violation()
        {
            return Self::Conflict(message(db_err.constraint()));
        }
        Self::Database(err)
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
