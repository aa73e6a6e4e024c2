//! Axum router configuration for the entitlement endpoints.

use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use super::handlers::{handle_play_push, health, verify_purchase, EntitlementAppState};

/// Create the entitlement API router.
///
/// # Routes
///
/// - `POST /api/subscriptions/verify` - Verify a purchase (caller in `X-User-Id`)
/// - `POST /api/webhooks/play` - Pub/Sub push of Play notifications
/// - `GET /health` - Liveness probe
pub fn entitlement_routes() -> Router<EntitlementAppState> {
    Router::new()
        .route("/api/subscriptions/verify", post(verify_purchase))
        .route("/api/webhooks/play", post(handle_play_push))
        .route("/health", get(health))
}

/// Complete application router with tracing and a per-request timeout.
pub fn entitlement_router(state: EntitlementAppState, request_timeout: Duration) -> Router {
    entitlement_routes()
        .with_state(state)
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
}
