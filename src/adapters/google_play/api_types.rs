//! Google Play Developer API wire types.
//!
//! Only the fields this service reads are modelled.

use serde::{Deserialize, Serialize};

use crate::domain::entitlement::{PaymentState, PurchaseSnapshot};
use crate::domain::foundation::{Timestamp, ValidationError};

/// `purchases.subscriptions.get` response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SubscriptionPurchase {
    pub(crate) order_id: Option<String>,
    /// Epoch millis as a decimal string.
    pub(crate) expiry_time_millis: Option<String>,
    #[serde(default)]
    pub(crate) auto_renewing: bool,
    pub(crate) payment_state: Option<i32>,
    /// Price in micro-units as a decimal string.
    pub(crate) price_amount_micros: Option<String>,
    pub(crate) price_currency_code: Option<String>,
}

impl TryFrom<SubscriptionPurchase> for PurchaseSnapshot {
    type Error = ValidationError;

    fn try_from(purchase: SubscriptionPurchase) -> Result<Self, Self::Error> {
        let expires_at = purchase
            .expiry_time_millis
            .as_deref()
            .map(|raw| Timestamp::parse_millis("expiryTimeMillis", raw))
            .transpose()?;
        let price_amount_micros = purchase
            .price_amount_micros
            .as_deref()
            .map(|raw| {
                raw.trim().parse::<i64>().map_err(|_| {
                    ValidationError::invalid_format("priceAmountMicros", "not an integer")
                })
            })
            .transpose()?;

        Ok(PurchaseSnapshot {
            order_id: purchase.order_id.filter(|id| !id.is_empty()),
            expires_at,
            auto_renewing: purchase.auto_renewing,
            payment_state: purchase.payment_state.map(PaymentState::from_code),
            price_amount_micros,
            price_currency_code: purchase.price_currency_code,
        })
    }
}

/// Service-account key file (the JSON downloaded from the cloud console).
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ServiceAccountKey {
    pub(crate) client_email: String,
    pub(crate) private_key: String,
    #[serde(default = "default_token_uri")]
    pub(crate) token_uri: String,
}

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

/// Claims of the JWT-bearer assertion exchanged for an access token.
#[derive(Debug, Serialize)]
pub(crate) struct AssertionClaims<'a> {
    pub(crate) iss: &'a str,
    pub(crate) scope: &'a str,
    pub(crate) aud: &'a str,
    pub(crate) iat: i64,
    pub(crate) exp: i64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub(crate) access_token: String,
    #[serde(default = "default_expires_in")]
    pub(crate) expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

/// OAuth error body returned by the token endpoint.
#[derive(Debug, Deserialize)]
pub(crate) struct OAuthErrorBody {
    pub(crate) error: String,
    #[serde(default)]
    pub(crate) error_description: Option<String>,
}

/// Error envelope returned by Google APIs.
#[derive(Debug, Deserialize)]
pub(crate) struct GoogleErrorBody {
    pub(crate) error: GoogleError,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GoogleError {
    #[serde(default)]
    pub(crate) message: String,
}

/// Best-effort extraction of a readable message from an error body.
pub(crate) fn error_message(body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<GoogleErrorBody>(body) {
        return parsed.error.message;
    }
    if let Ok(parsed) = serde_json::from_str::<OAuthErrorBody>(body) {
        return match parsed.error_description {
            Some(description) => format!("{}: {}", parsed.error, description),
            None => parsed.error,
        };
    }
    body.chars().take(200).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn purchase_converts_to_snapshot() {
        let purchase: SubscriptionPurchase = serde_json::from_str(
            r#"{
                "kind": "androidpublisher#subscriptionPurchase",
                "startTimeMillis": "1690000000000",
                "expiryTimeMillis": "1700000000000",
                "autoRenewing": true,
                "priceCurrencyCode": "CZK",
                "priceAmountMicros": "129000000",
                "paymentState": 1,
                "orderId": "GPA.3372-1234-5678-90123"
            }"#,
        )
        .unwrap();

        let snapshot = PurchaseSnapshot::try_from(purchase).unwrap();
        assert_eq!(snapshot.order_id.as_deref(), Some("GPA.3372-1234-5678-90123"));
        assert_eq!(snapshot.expires_at.unwrap().as_millis(), 1_700_000_000_000);
        assert!(snapshot.auto_renewing);
        assert_eq!(snapshot.payment_state, Some(PaymentState::Received));
        assert_eq!(snapshot.price_amount_micros, Some(129_000_000));
        assert_eq!(snapshot.price_currency_code.as_deref(), Some("CZK"));
    }

    #[test]
    fn sparse_purchase_uses_defaults() {
        let purchase: SubscriptionPurchase = serde_json::from_str(r#"{"orderId": ""}"#).unwrap();
        let snapshot = PurchaseSnapshot::try_from(purchase).unwrap();
        assert!(snapshot.order_id.is_none());
        assert!(!snapshot.auto_renewing);
        assert!(snapshot.payment_state.is_none());
        assert!(snapshot.expires_at.is_none());
    }

    #[test]
    fn malformed_expiry_is_rejected() {
        let purchase: SubscriptionPurchase =
            serde_json::from_str(r#"{"expiryTimeMillis": "tomorrow"}"#).unwrap();
        assert!(PurchaseSnapshot::try_from(purchase).is_err());
    }

    #[test]
    fn error_message_reads_both_envelopes() {
        assert_eq!(
            error_message(r#"{"error":{"code":404,"message":"The purchase token was not found."}}"#),
            "The purchase token was not found."
        );
        assert_eq!(
            error_message(r#"{"error":"invalid_grant","error_description":"Invalid JWT Signature."}"#),
            "invalid_grant: Invalid JWT Signature."
        );
        assert_eq!(error_message("plain text"), "plain text");
    }
}
