//! Google Play real-time developer notifications.
//!
//! A notification arrives as base64-encoded JSON inside a Pub/Sub message.
//! Only the fields the reconciliation logic reads are modelled.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::foundation::{PurchaseToken, Timestamp};

/// Subscription lifecycle event codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum NotificationType {
    Recovered,
    Renewed,
    Canceled,
    Purchased,
    OnHold,
    InGracePeriod,
    Restarted,
    PriceChangeConfirmed,
    Deferred,
    Paused,
    PauseScheduleChanged,
    Revoked,
    Expired,
    /// A code this service does not know about.
    Unknown(i32),
}

/// How a notification type is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationCategory {
    /// Subscription is (again) paid: premium, active.
    Activation,
    /// Renewal failed, provider retrying: premium, grace period.
    GracePeriod,
    /// Access suspended: free, on hold or paused.
    Hold,
    /// Auto-renew off: premium until the paid period ends.
    Cancellation,
    /// Subscription over: free, expired or revoked.
    Termination,
    /// Recorded in the log; no entitlement change.
    Informational,
    Unrecognized,
}

impl NotificationType {
    pub fn from_code(code: i32) -> Self {
        match code {
            1 => NotificationType::Recovered,
            2 => NotificationType::Renewed,
            3 => NotificationType::Canceled,
            4 => NotificationType::Purchased,
            5 => NotificationType::OnHold,
            6 => NotificationType::InGracePeriod,
            7 => NotificationType::Restarted,
            8 => NotificationType::PriceChangeConfirmed,
            9 => NotificationType::Deferred,
            10 => NotificationType::Paused,
            11 => NotificationType::PauseScheduleChanged,
            12 => NotificationType::Revoked,
            13 => NotificationType::Expired,
            other => NotificationType::Unknown(other),
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            NotificationType::Recovered => 1,
            NotificationType::Renewed => 2,
            NotificationType::Canceled => 3,
            NotificationType::Purchased => 4,
            NotificationType::OnHold => 5,
            NotificationType::InGracePeriod => 6,
            NotificationType::Restarted => 7,
            NotificationType::PriceChangeConfirmed => 8,
            NotificationType::Deferred => 9,
            NotificationType::Paused => 10,
            NotificationType::PauseScheduleChanged => 11,
            NotificationType::Revoked => 12,
            NotificationType::Expired => 13,
            NotificationType::Unknown(code) => *code,
        }
    }

    pub fn category(&self) -> NotificationCategory {
        use NotificationType::*;
        match self {
            Purchased | Renewed | Recovered | Restarted => NotificationCategory::Activation,
            InGracePeriod => NotificationCategory::GracePeriod,
            OnHold | Paused => NotificationCategory::Hold,
            Canceled => NotificationCategory::Cancellation,
            Expired | Revoked => NotificationCategory::Termination,
            PriceChangeConfirmed | Deferred | PauseScheduleChanged => {
                NotificationCategory::Informational
            }
            Unknown(_) => NotificationCategory::Unrecognized,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            NotificationType::Recovered => "SUBSCRIPTION_RECOVERED",
            NotificationType::Renewed => "SUBSCRIPTION_RENEWED",
            NotificationType::Canceled => "SUBSCRIPTION_CANCELED",
            NotificationType::Purchased => "SUBSCRIPTION_PURCHASED",
            NotificationType::OnHold => "SUBSCRIPTION_ON_HOLD",
            NotificationType::InGracePeriod => "SUBSCRIPTION_IN_GRACE_PERIOD",
            NotificationType::Restarted => "SUBSCRIPTION_RESTARTED",
            NotificationType::PriceChangeConfirmed => "SUBSCRIPTION_PRICE_CHANGE_CONFIRMED",
            NotificationType::Deferred => "SUBSCRIPTION_DEFERRED",
            NotificationType::Paused => "SUBSCRIPTION_PAUSED",
            NotificationType::PauseScheduleChanged => "SUBSCRIPTION_PAUSE_SCHEDULE_CHANGED",
            NotificationType::Revoked => "SUBSCRIPTION_REVOKED",
            NotificationType::Expired => "SUBSCRIPTION_EXPIRED",
            NotificationType::Unknown(_) => "UNKNOWN",
        }
    }
}

impl From<i32> for NotificationType {
    fn from(code: i32) -> Self {
        NotificationType::from_code(code)
    }
}

impl From<NotificationType> for i32 {
    fn from(kind: NotificationType) -> Self {
        kind.code()
    }
}

impl std::fmt::Display for NotificationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.name(), self.code())
    }
}

/// Top-level developer notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeveloperNotification {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub package_name: String,
    /// Epoch millis as a decimal string.
    #[serde(default)]
    pub event_time_millis: Option<String>,
    #[serde(default)]
    pub subscription_notification: Option<SubscriptionNotification>,
    #[serde(default)]
    pub test_notification: Option<TestNotification>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionNotification {
    #[serde(default)]
    pub version: Option<String>,
    pub notification_type: NotificationType,
    pub purchase_token: PurchaseToken,
    pub subscription_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestNotification {
    #[serde(default)]
    pub version: Option<String>,
}

/// Reasons a transport payload could not be turned into a notification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotificationDecodeError {
    #[error("empty message data")]
    Empty,

    #[error("invalid base64: {0}")]
    Base64(String),

    #[error("payload is not UTF-8")]
    Utf8,

    #[error("invalid notification JSON: {0}")]
    Json(String),
}

impl DeveloperNotification {
    /// Decodes the base64 `data` field of a transport message.
    pub fn decode(data: &str) -> Result<Self, NotificationDecodeError> {
        let data = data.trim();
        if data.is_empty() {
            return Err(NotificationDecodeError::Empty);
        }

        let bytes = STANDARD
            .decode(data)
            .map_err(|e| NotificationDecodeError::Base64(e.to_string()))?;
        let text = String::from_utf8(bytes).map_err(|_| NotificationDecodeError::Utf8)?;
        if text.trim().is_empty() {
            return Err(NotificationDecodeError::Empty);
        }

        serde_json::from_str(&text).map_err(|e| NotificationDecodeError::Json(e.to_string()))
    }

    /// Event time reported by the provider, if present and well-formed.
    pub fn event_time(&self) -> Option<Timestamp> {
        self.event_time_millis
            .as_deref()
            .and_then(|raw| Timestamp::parse_millis("eventTimeMillis", raw).ok())
    }

    pub fn is_test(&self) -> bool {
        self.test_notification.is_some()
    }
}
