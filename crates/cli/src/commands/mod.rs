//! CLI subcommands.

pub mod import;
pub mod migrate;
pub mod user;

use secrecy::{ExposeSecret, SecretString};
use sqlx::PgPool;

/// Primary database URL variable, shared with the service.
pub const DATABASE_URL_VAR: &str = "ORDERING_DATABASE_URL";

/// Read the database URL, falling back to `DATABASE_URL`.
///
/// Returns the name of the primary variable when neither is set.
pub fn database_url() -> Result<SecretString, &'static str> {
    dotenvy::dotenv().ok();

    std::env::var(DATABASE_URL_VAR)
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| DATABASE_URL_VAR)
}

/// Connect to the ordering database.
pub async fn connect(database_url: &SecretString) -> Result<PgPool, sqlx::Error> {
    tracing::info!("Connecting to ordering database...");
    PgPool::connect(database_url.expose_secret()).await
}
