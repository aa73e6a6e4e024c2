//! Foundation module - Shared domain primitives.
//!
//! Value objects, identifiers and error types that form the vocabulary of
//! the entitlement domain.

mod errors;
mod ids;
mod timestamp;

pub use errors::{DomainError, ErrorCode, ValidationError};
pub use ids::{OrderId, ProductId, PurchaseToken, UserId};
pub use timestamp::Timestamp;
