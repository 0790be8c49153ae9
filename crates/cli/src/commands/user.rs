//! Account management commands.
//!
//! # Usage
//!
//! ```bash
//! ord-cli user create -e buyer@example.com -p 'long password'
//! ord-cli user create -e shop@example.com -p 'long password' -r shop --company Acme
//! ```

use thiserror::Error;

use ordering_core::{UserId, UserRole};
use ordering_service::models::Profile;
use ordering_service::services::{AuthError, AuthService};

/// Errors that can occur during account operations.
#[derive(Debug, Error)]
pub enum UserError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    /// Invalid role.
    #[error("Invalid role: {0}. Valid roles: buyer, shop")]
    InvalidRole(String),

    /// Registration was rejected.
    #[error(transparent)]
    Auth(#[from] AuthError),
}

/// Create a new account.
///
/// # Returns
///
/// The ID of the created account.
///
/// # Errors
///
/// Returns `UserError` for an unknown role, an invalid email or password, a
/// duplicate email, or a database failure.
pub async fn create(
    email: &str,
    password: &str,
    role: &str,
    profile: &Profile,
) -> Result<UserId, UserError> {
    let role: UserRole = role
        .parse()
        .map_err(|_| UserError::InvalidRole(role.to_owned()))?;

    let database_url = super::database_url().map_err(UserError::MissingEnvVar)?;
    let pool = super::connect(&database_url).await?;

    tracing::info!("Creating {} account: {}", role, email);
    let user = AuthService::new(&pool)
        .register(email, password, role, profile)
        .await?;

    tracing::info!(
        "Account created successfully! ID: {}, Email: {}, Role: {}",
        user.id,
        user.email,
        user.role
    );
    Ok(user.id)
}
