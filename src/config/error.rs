//! Configuration errors

use thiserror::Error;

/// Loading or validating [`super::AppConfig`] failed.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not read configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// A loaded value that the service refuses to start with.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} must be set")]
    MissingRequired(&'static str),

    // server
    #[error("Server port must be non-zero")]
    InvalidPort,
    #[error("Request timeout is zero or above its limit")]
    InvalidTimeout,

    // database
    #[error("Database URL must use the postgres:// or postgresql:// scheme")]
    InvalidDatabaseUrl,
    #[error("Database pool min_connections exceeds max_connections")]
    InvalidPoolSize,
    #[error("Database pool max_connections exceeds 100")]
    PoolSizeTooLarge,

    // billing
    #[error("Invalid billing package name: {0}")]
    InvalidPackageName(String),
    #[error("Billing API base URL must use HTTPS in production")]
    BillingUrlMustBeHttps,

    // sweeper
    #[error("Sweep interval must be between 60 seconds and 7 days")]
    InvalidSweepInterval,
}
