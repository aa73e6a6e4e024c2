//! Append-only audit trail of received lifecycle notifications.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{DeveloperNotification, NotificationType};
use crate::domain::foundation::Timestamp;

/// Disposition of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditStatus {
    Processed,
    Error,
    Skipped,
}

impl AuditStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditStatus::Processed => "processed",
            AuditStatus::Error => "error",
            AuditStatus::Skipped => "skipped",
        }
    }
}

impl std::fmt::Display for AuditStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One audit row. Purchase tokens are stored truncated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationLogEntry {
    pub id: Uuid,
    pub package_name: Option<String>,
    pub event_time_millis: Option<String>,
    /// `None` for test notifications and payloads that could not be decoded.
    pub notification_type: Option<NotificationType>,
    pub subscription_id: Option<String>,
    pub purchase_token: Option<String>,
    pub status: AuditStatus,
    pub details: Option<String>,
    pub processed_at: Timestamp,
}

impl NotificationLogEntry {
    /// Entry describing a decoded notification.
    pub fn for_notification(
        notification: &DeveloperNotification,
        status: AuditStatus,
        details: Option<String>,
        now: Timestamp,
    ) -> Self {
        let sub = notification.subscription_notification.as_ref();
        Self {
            id: Uuid::new_v4(),
            package_name: Some(notification.package_name.clone()),
            event_time_millis: notification.event_time_millis.clone(),
            notification_type: sub.map(|s| s.notification_type),
            subscription_id: sub.map(|s| s.subscription_id.clone()),
            purchase_token: sub.map(|s| s.purchase_token.redacted()),
            status,
            details,
            processed_at: now,
        }
    }

    /// Entry for a payload that never decoded into a notification.
    pub fn malformed(details: impl Into<String>, now: Timestamp) -> Self {
        Self {
            id: Uuid::new_v4(),
            package_name: None,
            event_time_millis: None,
            notification_type: None,
            subscription_id: None,
            purchase_token: None,
            status: AuditStatus::Skipped,
            details: Some(details.into()),
            processed_at: now,
        }
    }

    /// Label used in place of a type code; test notifications have none.
    pub fn type_label(&self) -> String {
        self.notification_type
            .map(|kind| kind.code().to_string())
            .unwrap_or_else(|| "test".to_string())
    }
}
