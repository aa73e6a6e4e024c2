//! Entitlement HTTP adapter - verification, push delivery and health endpoints.

mod dto;
mod handlers;
mod routes;

pub use dto::{ErrorResponse, PushEnvelope, PushMessage, VerifyRequest, VerifyResponse};
pub use handlers::{CallerIdentity, EntitlementAppState, VerificationApiError};
pub use routes::{entitlement_router, entitlement_routes};
