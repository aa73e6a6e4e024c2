//! HTTP handlers for the entitlement endpoints.
//!
//! These handlers connect Axum routes to the application layer handlers.

use std::convert::Infallible;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Bytes;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequestParts, Json, Query, State};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use secrecy::{ExposeSecret, SecretString};
use subtle::ConstantTimeEq;

use crate::application::{
    HandlePlayNotificationCommand, HandlePlayNotificationHandler, TransitionRegistry,
    UserResolver, VerifyPurchaseCommand, VerifyPurchaseHandler,
};
use crate::domain::entitlement::VerificationError;
use crate::domain::foundation::UserId;
use crate::ports::{BillingOracle, NotificationLog, ProcessedOrderRepository, SubscriptionRepository};

use super::dto::{ErrorResponse, PushEnvelope, PushQuery, VerifyRequest, VerifyResponse};

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared dependencies of the entitlement endpoints.
#[derive(Clone)]
pub struct EntitlementAppState {
    pub subscriptions: Arc<dyn SubscriptionRepository>,
    pub processed_orders: Arc<dyn ProcessedOrderRepository>,
    pub notification_log: Arc<dyn NotificationLog>,
    pub billing_oracle: Arc<dyn BillingOracle>,
    /// Package whose notifications are accepted.
    pub package_name: String,
    /// Expected `token` query parameter on push deliveries.
    pub push_token: Option<Arc<SecretString>>,
}

impl EntitlementAppState {
    pub fn verify_handler(&self) -> VerifyPurchaseHandler {
        VerifyPurchaseHandler::new(
            self.subscriptions.clone(),
            self.processed_orders.clone(),
            self.billing_oracle.clone(),
        )
    }

    pub fn notification_handler(&self) -> HandlePlayNotificationHandler {
        HandlePlayNotificationHandler::new(
            self.package_name.clone(),
            UserResolver::new(self.subscriptions.clone()),
            TransitionRegistry::standard(self.subscriptions.clone(), self.billing_oracle.clone()),
            self.notification_log.clone(),
        )
    }

    fn push_token_matches(&self, provided: Option<&str>) -> bool {
        match &self.push_token {
            None => true,
            Some(expected) => provided
                .map(|provided| {
                    bool::from(provided.as_bytes().ct_eq(expected.expose_secret().as_bytes()))
                })
                .unwrap_or(false),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Caller Identity
// ════════════════════════════════════════════════════════════════════════════════

/// Caller identity set by the gateway in the `X-User-Id` header.
///
/// Never rejects: a missing identity is reported by the verification handler
/// so the error body matches the rest of the taxonomy.
#[derive(Debug, Clone)]
pub struct CallerIdentity(pub Option<UserId>);

#[async_trait]
impl<S> FromRequestParts<S> for CallerIdentity
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get("X-User-Id")
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .and_then(|s| UserId::new(s).ok());

        Ok(CallerIdentity(user_id))
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Handlers
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/subscriptions/verify - Verify a purchase and grant premium
pub async fn verify_purchase(
    State(state): State<EntitlementAppState>,
    CallerIdentity(caller): CallerIdentity,
    body: Result<Json<VerifyRequest>, JsonRejection>,
) -> Result<impl IntoResponse, VerificationApiError> {
    let request = match body {
        Ok(Json(request)) => request,
        Err(_) if caller.is_none() => return Err(VerificationError::Unauthenticated.into()),
        Err(rejection) => {
            return Err(VerificationError::invalid_argument(rejection.body_text()).into())
        }
    };

    let cmd = VerifyPurchaseCommand {
        caller,
        uid: request.uid,
        product_id: request.product_id,
        purchase_token: request.purchase_token,
        platform: request.platform,
    };

    let result = state.verify_handler().handle(cmd).await?;
    Ok(Json(VerifyResponse::from(result)))
}

/// POST /api/webhooks/play - Pub/Sub push delivery of a Play notification
///
/// Every authorized delivery is acknowledged with 204, whatever the outcome,
/// so Pub/Sub never redelivers a message that cannot be processed.
pub async fn handle_play_push(
    State(state): State<EntitlementAppState>,
    Query(query): Query<PushQuery>,
    body: Bytes,
) -> impl IntoResponse {
    if !state.push_token_matches(query.token.as_deref()) {
        tracing::warn!("Rejected push delivery with invalid token");
        let error = ErrorResponse::new("unauthenticated", "Invalid push token");
        return (StatusCode::UNAUTHORIZED, Json(error)).into_response();
    }

    let envelope: PushEnvelope = serde_json::from_slice(&body).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Push body is not a Pub/Sub envelope");
        PushEnvelope::default()
    });
    tracing::debug!(
        message_id = envelope.message.message_id.as_deref().unwrap_or(""),
        subscription = envelope.subscription.as_deref().unwrap_or(""),
        "Received Play push"
    );

    let cmd = HandlePlayNotificationCommand {
        data: envelope.message.data,
    };
    let outcome = state.notification_handler().handle(cmd).await;
    tracing::debug!(outcome = ?outcome, "Play push handled");

    StatusCode::NO_CONTENT.into_response()
}

/// GET /health - Liveness probe
pub async fn health() -> &'static str {
    "ok"
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error type that converts verification errors to HTTP responses.
#[derive(Debug)]
pub struct VerificationApiError(VerificationError);

impl From<VerificationError> for VerificationApiError {
    fn from(err: VerificationError) -> Self {
        Self(err)
    }
}

impl IntoResponse for VerificationApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.0.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "Verification failed");
        }
        let body = ErrorResponse::new(self.0.code(), self.0.to_string());
        (status, Json(body)).into_response()
    }
}
