//! Service configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `ORDERING_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//!
//! ## Optional
//! - `ORDERING_HOST` - Bind address (default: 127.0.0.1)
//! - `ORDERING_PORT` - Listen port (default: 8000)
//! - `ORDERING_BASE_URL` - Public URL (default: `http://{host}:{port}`)
//! - `ORDERING_NOTIFICATION_QUEUE_CAPACITY` - Pending notifications kept in memory (default: 256)
//! - `ORDERING_IMPORT_MAX_BYTES` - Largest accepted catalog document (default: 5 MiB)
//! - `SMTP_HOST`, `SMTP_PORT`, `SMTP_USERNAME`, `SMTP_PASSWORD`, `EMAIL_FROM` -
//!   Outbound email. Either all of host/username/password/from are set or none;
//!   without them status notifications are only logged.
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use secrecy::SecretString;
use thiserror::Error;

/// Default notification queue capacity.
pub const DEFAULT_NOTIFICATION_QUEUE_CAPACITY: usize = 256;

/// Default maximum catalog document size (5 MiB).
pub const DEFAULT_IMPORT_MAX_BYTES: usize = 5 * 1024 * 1024;

/// SMTP variables that must be set together.
const EMAIL_VARS: [&str; 4] = ["SMTP_HOST", "SMTP_USERNAME", "SMTP_PASSWORD", "EMAIL_FROM"];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Ordering service configuration.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL of the service
    pub base_url: String,
    /// Capacity of the outbound notification queue
    pub notification_queue_capacity: usize,
    /// Largest catalog document accepted by the import endpoints
    pub import_max_bytes: usize,
    /// SMTP settings, `None` when email delivery is not configured
    pub email: Option<EmailConfig>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "staging", "production")
    pub sentry_environment: Option<String>,
}

/// Email (SMTP) configuration.
///
/// Implements `Debug` manually to redact the SMTP password.
#[derive(Clone)]
pub struct EmailConfig {
    /// SMTP server hostname
    pub smtp_host: String,
    /// SMTP server port
    pub smtp_port: u16,
    /// SMTP authentication username
    pub smtp_username: String,
    /// SMTP authentication password
    pub smtp_password: SecretString,
    /// Email sender address (From header)
    pub from_address: String,
}

impl std::fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailConfig")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_username", &self.smtp_username)
            .field("smtp_password", &"[REDACTED]")
            .field("from_address", &self.from_address)
            .finish()
    }
}

impl ServiceConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("ORDERING_DATABASE_URL")?;
        let host: IpAddr = get_parsed_env_or_default("ORDERING_HOST", "127.0.0.1")?;
        let port: u16 = get_parsed_env_or_default("ORDERING_PORT", "8000")?;
        let base_url = get_optional_env("ORDERING_BASE_URL")
            .unwrap_or_else(|| format!("http://{}", SocketAddr::new(host, port)));

        let notification_queue_capacity: usize = get_parsed_env_or_default(
            "ORDERING_NOTIFICATION_QUEUE_CAPACITY",
            &DEFAULT_NOTIFICATION_QUEUE_CAPACITY.to_string(),
        )?;
        if notification_queue_capacity == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "ORDERING_NOTIFICATION_QUEUE_CAPACITY".to_string(),
                "must be greater than zero".to_string(),
            ));
        }
        let import_max_bytes: usize = get_parsed_env_or_default(
            "ORDERING_IMPORT_MAX_BYTES",
            &DEFAULT_IMPORT_MAX_BYTES.to_string(),
        )?;

        let email = EmailConfig::from_env()?;
        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            notification_queue_capacity,
            import_max_bytes,
            email,
            sentry_dsn,
            sentry_environment,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether the service is served over HTTPS (controls secure cookies).
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

impl EmailConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let present = EMAIL_VARS
            .iter()
            .filter(|key| get_optional_env(key).is_some())
            .count();
        match present {
            0 => return Ok(None),
            n if n < EMAIL_VARS.len() => {
                let missing = EMAIL_VARS
                    .iter()
                    .find(|key| get_optional_env(key).is_none())
                    .map_or_else(String::new, ToString::to_string);
                return Err(ConfigError::MissingEnvVar(missing));
            }
            _ => {}
        }

        Ok(Some(Self {
            smtp_host: get_required_env("SMTP_HOST")?,
            smtp_port: get_parsed_env_or_default("SMTP_PORT", "587")?,
            smtp_username: get_required_env("SMTP_USERNAME")?,
            smtp_password: get_required_secret("SMTP_PASSWORD")?,
            from_address: get_required_env("EMAIL_FROM")?,
        }))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get a required environment variable as a secret.
fn get_required_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    Ok(SecretString::from(value))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable. Empty values count as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Get an environment variable with a default value and parse it.
fn get_parsed_env_or_default<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}
