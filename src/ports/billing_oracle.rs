//! Billing oracle port - authoritative purchase state from the store.
//!
//! The oracle is queried at the moment of a transition instead of trusting
//! notification payloads, which carry no expiry or payment data.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::entitlement::PurchaseSnapshot;
use crate::domain::foundation::{ProductId, PurchaseToken};

#[async_trait]
pub trait BillingOracle: Send + Sync {
    /// Fetches the current state of a subscription purchase.
    async fn get_subscription(
        &self,
        product_id: &ProductId,
        token: &PurchaseToken,
    ) -> Result<PurchaseSnapshot, OracleError>;
}

/// Billing oracle failures, categorized by how the caller should react.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OracleError {
    /// Unknown purchase token or product (HTTP 404).
    #[error("Purchase not found")]
    NotFound,

    /// Service-account authentication rejected (HTTP 401, `invalid_grant`).
    #[error("Billing API authentication failed: {0}")]
    Unauthorized(String),

    /// Service account lacks permission on the application (HTTP 403).
    #[error("Billing API access denied: {0}")]
    Forbidden(String),

    /// Purchase is no longer available (HTTP 410).
    #[error("Purchase is gone")]
    Gone,

    /// Service-account key could not be loaded.
    #[error("Billing credentials unavailable: {0}")]
    CredentialsUnavailable(String),

    /// Provider returned another error status.
    #[error("Billing API error {status}: {message}")]
    Upstream { status: u16, message: String },

    /// Network or timeout failure.
    #[error("Billing API unreachable: {0}")]
    Transport(String),

    /// Response body could not be interpreted.
    #[error("Invalid billing API response: {0}")]
    InvalidResponse(String),
}

impl OracleError {
    /// Maps a non-success HTTP status onto an error category.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            404 => OracleError::NotFound,
            401 => OracleError::Unauthorized(message),
            403 => OracleError::Forbidden(message),
            410 => OracleError::Gone,
            _ => OracleError::Upstream { status, message },
        }
    }

    /// Transient failures worth retrying on a later delivery.
    pub fn is_retryable(&self) -> bool {
        match self {
            OracleError::Transport(_) => true,
            OracleError::Upstream { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}
