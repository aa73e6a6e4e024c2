//! HTTP DTOs for the entitlement endpoints.
//!
//! Verification payloads use the client SDK's camelCase field names. Millis
//! and micros are decimal strings, as in the billing API.

use serde::{Deserialize, Serialize};

use crate::application::VerifyPurchaseResult;

// ════════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Body of `POST /api/subscriptions/verify`.
///
/// Missing fields deserialize as empty and are rejected as invalid arguments.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VerifyRequest {
    pub uid: String,
    pub product_id: String,
    pub purchase_token: String,
    pub platform: String,
}

/// Pub/Sub push envelope.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PushEnvelope {
    #[serde(default)]
    pub message: PushMessage,
    #[serde(default)]
    pub subscription: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushMessage {
    /// Base64-encoded developer notification.
    #[serde(default)]
    pub data: String,
    #[serde(default)]
    pub message_id: Option<String>,
    #[serde(default)]
    pub publish_time: Option<String>,
}

/// Query string of the push endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PushQuery {
    pub token: Option<String>,
}

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry_time_millis: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_renewing: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_amount_micros: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_currency_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub already_processed: Option<bool>,
}

impl From<VerifyPurchaseResult> for VerifyResponse {
    fn from(result: VerifyPurchaseResult) -> Self {
        Self {
            valid: result.valid,
            order_id: result.order_id,
            expiry_time_millis: result.expires_at.map(|t| t.as_millis().to_string()),
            auto_renewing: result.auto_renewing,
            price_amount_micros: result.price_amount_micros.map(|m| m.to_string()),
            price_currency_code: result.price_currency_code,
            error: result.error,
            already_processed: result.already_processed.then_some(true),
        }
    }
}

/// Error body: stable code plus human-readable message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}
