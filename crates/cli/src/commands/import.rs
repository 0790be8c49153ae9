//! Catalog import command.
//!
//! Runs the same import as `POST /goods-import`, on behalf of an existing
//! shop account.
//!
//! # Usage
//!
//! ```bash
//! ord-cli import -e shop@example.com -f data/shop1.yaml
//! ```

use std::path::Path;

use thiserror::Error;

use ordering_core::{Email, EmailError};
use ordering_service::db::RepositoryError;
use ordering_service::db::users::UserRepository;
use ordering_service::error::AppError;
use ordering_service::models::{CurrentUser, ImportSummary};
use ordering_service::services::{CatalogService, ImportSource};

/// Errors that can occur while importing.
#[derive(Debug, Error)]
pub enum ImportCommandError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    /// The catalog file could not be read.
    #[error("Cannot read {path}: {source}")]
    Read {
        /// File that was requested.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Invalid email.
    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// No account with that email.
    #[error("No account with email: {0}")]
    UnknownUser(String),

    /// Account lookup failed.
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// The import was rejected or failed.
    #[error(transparent)]
    Import(#[from] AppError),
}

/// Import the catalog in `file` for the shop account `email`.
///
/// # Errors
///
/// Returns `ImportCommandError` if the file cannot be read, the account does
/// not exist, or the import is rejected.
pub async fn run(email: &str, file: &Path) -> Result<ImportSummary, ImportCommandError> {
    let text = tokio::fs::read_to_string(file)
        .await
        .map_err(|source| ImportCommandError::Read {
            path: file.display().to_string(),
            source,
        })?;
    let email = Email::parse(email)?;

    let database_url = super::database_url().map_err(ImportCommandError::MissingEnvVar)?;
    let pool = super::connect(&database_url).await?;

    let user = UserRepository::new(&pool)
        .get_by_email(&email)
        .await?
        .ok_or_else(|| ImportCommandError::UnknownUser(email.to_string()))?;
    let user = CurrentUser::from(&user);

    let filename = file.file_name().and_then(|name| name.to_str());
    let summary = CatalogService::new(&pool)
        .import(&user, &text, ImportSource::upload(filename))
        .await?;

    tracing::info!(
        "Catalog imported! Shop ID: {}, categories: {}, goods: {}, parameters: {}",
        summary.shop_id,
        summary.categories,
        summary.goods,
        summary.parameters
    );
    Ok(summary)
}
