//! HandlePlayNotificationHandler - Classifies and applies one lifecycle notification.
//!
//! The handler never fails: every outcome is logged, written to the
//! notification audit log, and reported as a [`NotificationOutcome`]. The push
//! transport is always acknowledged so a bad message cannot be redelivered
//! forever.

use std::sync::Arc;

use super::resolve_user::UserResolver;
use super::transitions::{TransitionContext, TransitionRegistry};
use crate::domain::entitlement::{
    ApplyOutcome, AuditStatus, DeveloperNotification, NotificationCategory, NotificationLogEntry,
};
use crate::domain::foundation::Timestamp;
use crate::ports::NotificationLog;

/// Characters of the purchase token written to logs.
const LOG_TOKEN_PREFIX: usize = 20;

/// Command carrying the base64 `data` of a push message.
#[derive(Debug, Clone)]
pub struct HandlePlayNotificationCommand {
    pub data: String,
}

/// How a notification was disposed of.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationOutcome {
    Processed,
    Skipped(String),
    Failed(String),
}

impl NotificationOutcome {
    fn audit_status(&self) -> AuditStatus {
        match self {
            NotificationOutcome::Processed => AuditStatus::Processed,
            NotificationOutcome::Skipped(_) => AuditStatus::Skipped,
            NotificationOutcome::Failed(_) => AuditStatus::Error,
        }
    }
}

pub struct HandlePlayNotificationHandler {
    package_name: String,
    resolver: UserResolver,
    registry: TransitionRegistry,
    audit_log: Arc<dyn NotificationLog>,
}

impl HandlePlayNotificationHandler {
    pub fn new(
        package_name: impl Into<String>,
        resolver: UserResolver,
        registry: TransitionRegistry,
        audit_log: Arc<dyn NotificationLog>,
    ) -> Self {
        Self {
            package_name: package_name.into(),
            resolver,
            registry,
            audit_log,
        }
    }

    pub async fn handle(&self, cmd: HandlePlayNotificationCommand) -> NotificationOutcome {
        let now = Timestamp::now();

        let notification = match DeveloperNotification::decode(&cmd.data) {
            Ok(notification) => notification,
            Err(e) => {
                let details = format!("Malformed payload: {}", e);
                tracing::error!(error = %e, "Discarding malformed Play notification");
                self.audit(NotificationLogEntry::malformed(details.clone(), now))
                    .await;
                return NotificationOutcome::Skipped(details);
            }
        };

        let outcome = self.classify(&notification, now).await;
        let details = match &outcome {
            NotificationOutcome::Processed => self.processed_details(&notification),
            NotificationOutcome::Skipped(reason) | NotificationOutcome::Failed(reason) => {
                Some(reason.clone())
            }
        };
        self.audit(NotificationLogEntry::for_notification(
            &notification,
            outcome.audit_status(),
            details,
            now,
        ))
        .await;

        outcome
    }

    async fn classify(
        &self,
        notification: &DeveloperNotification,
        now: Timestamp,
    ) -> NotificationOutcome {
        if notification.package_name != self.package_name {
            tracing::warn!(
                package_name = %notification.package_name,
                expected = %self.package_name,
                "Ignoring notification for unknown package"
            );
            return NotificationOutcome::Skipped("Unknown package name".to_string());
        }

        if notification.is_test() {
            tracing::info!(package_name = %notification.package_name, "Received test notification");
            return NotificationOutcome::Processed;
        }

        let Some(sub) = notification.subscription_notification.as_ref() else {
            tracing::warn!("Notification carries no subscription notification");
            return NotificationOutcome::Skipped("No subscription notification".to_string());
        };

        let kind = sub.notification_type;
        let token_prefix = sub.purchase_token.prefix(LOG_TOKEN_PREFIX);

        let uid = match self.resolver.resolve(&sub.purchase_token).await {
            Ok(Some(uid)) => uid,
            Ok(None) => {
                tracing::warn!(
                    notification_type = %kind,
                    token_prefix,
                    "No user found for purchase token"
                );
                return NotificationOutcome::Skipped("User not found".to_string());
            }
            Err(e) => {
                tracing::error!(error = %e, token_prefix, "Failed to resolve user");
                return NotificationOutcome::Failed(e.to_string());
            }
        };

        match kind.category() {
            NotificationCategory::Informational => {
                tracing::info!(uid = %uid, notification_type = %kind, "Informational notification");
                return NotificationOutcome::Processed;
            }
            NotificationCategory::Unrecognized => {
                tracing::warn!(uid = %uid, notification_type = %kind, "Unknown notification type");
                return NotificationOutcome::Processed;
            }
            _ => {}
        }

        let Some(handler) = self.registry.get(kind.category()) else {
            tracing::warn!(notification_type = %kind, "No handler registered");
            return NotificationOutcome::Processed;
        };

        let ctx = TransitionContext {
            uid: &uid,
            notification: sub,
            event_at: notification.event_time(),
            now,
        };

        match handler.handle(&ctx).await {
            Ok(ApplyOutcome::Applied) => {
                tracing::info!(uid = %uid, notification_type = %kind, "Subscription updated");
                NotificationOutcome::Processed
            }
            Ok(ApplyOutcome::Stale) => {
                tracing::info!(
                    uid = %uid,
                    notification_type = %kind,
                    event_time_millis = notification.event_time_millis.as_deref().unwrap_or(""),
                    "Ignoring notification older than applied state"
                );
                NotificationOutcome::Skipped("Stale event".to_string())
            }
            Err(e) => {
                tracing::error!(
                    uid = %uid,
                    notification_type = %kind,
                    token_prefix,
                    error = %e,
                    "Failed to apply notification"
                );
                NotificationOutcome::Failed(e.to_string())
            }
        }
    }

    fn processed_details(&self, notification: &DeveloperNotification) -> Option<String> {
        if notification.is_test() {
            return Some("Test notification".to_string());
        }
        let category = notification
            .subscription_notification
            .as_ref()
            .map(|sub| sub.notification_type.category());
        match category {
            Some(NotificationCategory::Informational) => Some("Logged only".to_string()),
            Some(NotificationCategory::Unrecognized) => {
                Some("Unknown notification type".to_string())
            }
            _ => None,
        }
    }

    async fn audit(&self, entry: NotificationLogEntry) {
        if let Err(e) = self.audit_log.append(&entry).await {
            tracing::error!(
                error = %e,
                status = %entry.status,
                notification_type = %entry.type_label(),
                "Failed to write notification audit entry"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::google_play::MockBillingOracle;
    use crate::adapters::memory::InMemoryEntitlementStore;
    use crate::domain::entitlement::{EntitlementTier, NotificationType, SubscriptionUpdate};
    use crate::domain::foundation::{PurchaseToken, UserId};
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;

    const PACKAGE: &str = "com.example.app";

    fn handler(store: &InMemoryEntitlementStore, oracle: &MockBillingOracle) -> HandlePlayNotificationHandler {
        let subscriptions = Arc::new(store.clone());
        HandlePlayNotificationHandler::new(
            PACKAGE,
            UserResolver::new(subscriptions.clone()),
            TransitionRegistry::standard(subscriptions, Arc::new(oracle.clone())),
            Arc::new(store.clone()),
        )
    }

    fn command(json: serde_json::Value) -> HandlePlayNotificationCommand {
        HandlePlayNotificationCommand {
            data: STANDARD.encode(json.to_string()),
        }
    }

    fn lifecycle(kind: i32, token: &str) -> HandlePlayNotificationCommand {
        command(serde_json::json!({
            "version": "1.0",
            "packageName": PACKAGE,
            "eventTimeMillis": "1700000000000",
            "subscriptionNotification": {
                "version": "1.0",
                "notificationType": kind,
                "purchaseToken": token,
                "subscriptionId": "premium_monthly"
            }
        }))
    }

    async fn seed_user(store: &InMemoryEntitlementStore, uid: &str, token: &str) {
        store
            .put_record(
                SubscriptionUpdate::new(Timestamp::now())
                    .tier(EntitlementTier::Premium)
                    .purchase_token(PurchaseToken::new(token).unwrap())
                    .into_record(UserId::new(uid).unwrap()),
            )
            .await;
    }

    #[tokio::test]
    async fn malformed_payload_is_skipped_and_audited() {
        let store = InMemoryEntitlementStore::new();
        let handler = handler(&store, &MockBillingOracle::new());

        let outcome = handler
            .handle(HandlePlayNotificationCommand { data: "%%%".to_string() })
            .await;

        assert!(matches!(outcome, NotificationOutcome::Skipped(ref d) if d.starts_with("Malformed payload")));
        let entries = store.audit_entries().await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].status, AuditStatus::Skipped);
    }

    #[tokio::test]
    async fn hold_downgrades_resolved_user() {
        let store = InMemoryEntitlementStore::new();
        let oracle = MockBillingOracle::new();
        seed_user(&store, "alice", "tok-1").await;

        let outcome = handler(&store, &oracle).handle(lifecycle(5, "tok-1")).await;

        assert_eq!(outcome, NotificationOutcome::Processed);
        let record = store.record(&UserId::new("alice").unwrap()).await.unwrap();
        assert_eq!(record.tier, EntitlementTier::Free);
        assert_eq!(record.last_notification_type, Some(NotificationType::OnHold));
        assert_eq!(store.audit_entries().await[0].status, AuditStatus::Processed);
        assert_eq!(oracle.call_count(), 0);
    }

    #[tokio::test]
    async fn store_failure_is_reported_as_failed() {
        let store = InMemoryEntitlementStore::new();
        let handler = handler(&store, &MockBillingOracle::new());
        store.set_failing(true);

        let outcome = handler.handle(lifecycle(5, "tok-1")).await;

        assert!(matches!(outcome, NotificationOutcome::Failed(_)));
    }
}
