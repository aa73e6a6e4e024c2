//! Caller-facing errors of purchase verification.
//!
//! # HTTP Status Mapping
//!
//! | Error | Code | HTTP Status |
//! |-------|------|-------------|
//! | Unauthenticated | unauthenticated | 401 |
//! | InvalidArgument | invalid-argument | 400 |
//! | PermissionDenied | permission-denied | 403 |
//! | Unimplemented | unimplemented | 501 |
//! | AlreadyExists | already-exists | 409 |
//! | Internal | internal | 500 |
//!
//! Rejections the client can act on (pending payment, purchase not found)
//! are not errors; they are returned as `valid = false` results.

use axum::http::StatusCode;
use thiserror::Error;

use crate::domain::foundation::{DomainError, ValidationError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerificationError {
    #[error("Caller must be signed in")]
    Unauthenticated,

    #[error("Missing or invalid argument: {0}")]
    InvalidArgument(String),

    #[error("uid does not match the signed-in user")]
    PermissionDenied,

    #[error("Platform '{0}' is not supported")]
    Unimplemented(String),

    #[error("This purchase has already been processed for another user")]
    AlreadyExists,

    #[error("Verification failed: {0}")]
    Internal(String),
}

impl VerificationError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        VerificationError::InvalidArgument(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        VerificationError::Internal(message.into())
    }

    /// Stable, machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            VerificationError::Unauthenticated => "unauthenticated",
            VerificationError::InvalidArgument(_) => "invalid-argument",
            VerificationError::PermissionDenied => "permission-denied",
            VerificationError::Unimplemented(_) => "unimplemented",
            VerificationError::AlreadyExists => "already-exists",
            VerificationError::Internal(_) => "internal",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            VerificationError::Unauthenticated => StatusCode::UNAUTHORIZED,
            VerificationError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            VerificationError::PermissionDenied => StatusCode::FORBIDDEN,
            VerificationError::Unimplemented(_) => StatusCode::NOT_IMPLEMENTED,
            VerificationError::AlreadyExists => StatusCode::CONFLICT,
            VerificationError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ValidationError> for VerificationError {
    fn from(err: ValidationError) -> Self {
        VerificationError::InvalidArgument(err.to_string())
    }
}

impl From<DomainError> for VerificationError {
    fn from(err: DomainError) -> Self {
        VerificationError::Internal(err.to_string())
    }
}
