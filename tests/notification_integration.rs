//! Integration tests for lifecycle notification handling.
//!
//! Drives `HandlePlayNotificationHandler` end to end against the in-memory
//! store and the mock billing oracle:
//! 1. Classification order (malformed, package, test, missing payload, user)
//! 2. Dispatch of every notification category
//! 3. Event ordering and audit trail contents

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::json;

use entitlement_sync::adapters::google_play::MockBillingOracle;
use entitlement_sync::adapters::memory::InMemoryEntitlementStore;
use entitlement_sync::application::{
    HandlePlayNotificationCommand, HandlePlayNotificationHandler, NotificationOutcome,
    TransitionRegistry, UserResolver,
};
use entitlement_sync::domain::entitlement::{
    AuditStatus, EntitlementTier, NotificationType, SubscriptionStatus, SubscriptionUpdate,
};
use entitlement_sync::domain::foundation::{PurchaseToken, Timestamp, UserId};
use entitlement_sync::ports::OracleError;

// =============================================================================
// Test Infrastructure
// =============================================================================

const PACKAGE: &str = "com.example.weddingplanner";
const TOKEN: &str = "tok-alice-0123456789-abcdefghijklmnopqrstuvwxyz";

struct Harness {
    store: InMemoryEntitlementStore,
    oracle: MockBillingOracle,
    handler: HandlePlayNotificationHandler,
}

impl Harness {
    fn new() -> Self {
        let store = InMemoryEntitlementStore::new();
        let oracle = MockBillingOracle::new();
        let subscriptions = Arc::new(store.clone());
        let handler = HandlePlayNotificationHandler::new(
            PACKAGE,
            UserResolver::new(subscriptions.clone()),
            TransitionRegistry::standard(subscriptions, Arc::new(oracle.clone())),
            Arc::new(store.clone()),
        );
        Self {
            store,
            oracle,
            handler,
        }
    }

    async fn with_user() -> Self {
        let harness = Self::new();
        harness
            .store
            .put_record(
                SubscriptionUpdate::new(Timestamp::now())
                    .tier(EntitlementTier::Premium)
                    .status(SubscriptionStatus::Active)
                    .purchase_token(PurchaseToken::new(TOKEN).unwrap())
                    .expires_at(Some(Timestamp::now().plus_days(20)))
                    .into_record(alice()),
            )
            .await;
        harness
    }

    async fn send(&self, payload: serde_json::Value) -> NotificationOutcome {
        self.handler
            .handle(HandlePlayNotificationCommand {
                data: STANDARD.encode(payload.to_string()),
            })
            .await
    }

    async fn send_lifecycle(&self, kind: i32, event_time_millis: i64) -> NotificationOutcome {
        self.send(lifecycle(PACKAGE, kind, event_time_millis)).await
    }
}

fn alice() -> UserId {
    UserId::new("alice").unwrap()
}

fn lifecycle(package: &str, kind: i32, event_time_millis: i64) -> serde_json::Value {
    json!({
        "version": "1.0",
        "packageName": package,
        "eventTimeMillis": event_time_millis.to_string(),
        "subscriptionNotification": {
            "version": "1.0",
            "notificationType": kind,
            "purchaseToken": TOKEN,
            "subscriptionId": "premium_yearly"
        }
    })
}

fn now_millis() -> i64 {
    Timestamp::now().as_millis()
}

// =============================================================================
// Classification
// =============================================================================

#[tokio::test]
async fn undecodable_data_is_skipped_as_malformed() {
    let harness = Harness::new();

    for data in ["", "not-base64!!", &STANDARD.encode("{not json")] {
        let outcome = harness
            .handler
            .handle(HandlePlayNotificationCommand {
                data: data.to_string(),
            })
            .await;
        assert!(
            matches!(&outcome, NotificationOutcome::Skipped(d) if d.starts_with("Malformed payload")),
            "unexpected outcome for {:?}: {:?}",
            data,
            outcome
        );
    }

    let entries = harness.store.audit_entries().await;
    assert_eq!(entries.len(), 3);
    assert!(entries.iter().all(|e| e.status == AuditStatus::Skipped));
    assert!(entries.iter().all(|e| e.notification_type.is_none()));
}

#[tokio::test]
async fn unknown_package_is_never_dispatched() {
    let harness = Harness::with_user().await;

    let outcome = harness
        .send(lifecycle("com.attacker.app", 13, now_millis()))
        .await;

    assert_eq!(
        outcome,
        NotificationOutcome::Skipped("Unknown package name".to_string())
    );
    let record = harness.store.record(&alice()).await.unwrap();
    assert_eq!(record.tier, EntitlementTier::Premium);
    assert_eq!(harness.oracle.call_count(), 0);

    let entries = harness.store.audit_entries().await;
    assert_eq!(entries[0].status, AuditStatus::Skipped);
    assert_eq!(entries[0].details.as_deref(), Some("Unknown package name"));
}

#[tokio::test]
async fn test_notification_is_processed_without_writes() {
    let harness = Harness::new();

    let outcome = harness
        .send(json!({
            "version": "1.0",
            "packageName": PACKAGE,
            "eventTimeMillis": "1700000000000",
            "testNotification": {"version": "1.0"}
        }))
        .await;

    assert_eq!(outcome, NotificationOutcome::Processed);
    assert!(harness.store.records().await.is_empty());

    let entries = harness.store.audit_entries().await;
    assert_eq!(entries[0].status, AuditStatus::Processed);
    assert_eq!(entries[0].details.as_deref(), Some("Test notification"));
    assert_eq!(entries[0].type_label(), "test");
}

#[tokio::test]
async fn missing_subscription_notification_is_skipped() {
    let harness = Harness::new();

    let outcome = harness
        .send(json!({"version": "1.0", "packageName": PACKAGE}))
        .await;

    assert_eq!(
        outcome,
        NotificationOutcome::Skipped("No subscription notification".to_string())
    );
}

#[tokio::test]
async fn unknown_token_is_skipped_as_user_not_found() {
    let harness = Harness::new();

    let outcome = harness.send_lifecycle(4, now_millis()).await;

    assert_eq!(
        outcome,
        NotificationOutcome::Skipped("User not found".to_string())
    );
    assert_eq!(harness.oracle.call_count(), 0);
    assert!(harness.store.records().await.is_empty());
}

// =============================================================================
// Dispatch
// =============================================================================

#[tokio::test]
async fn activation_types_grant_premium() {
    for code in [1, 2, 4, 7] {
        let harness = Harness::with_user().await;
        let expires = Timestamp::now().plus_days(365);
        harness
            .oracle
            .set_purchase(TOKEN, MockBillingOracle::paid("GPA.1", expires));

        let outcome = harness.send_lifecycle(code, now_millis()).await;

        assert_eq!(outcome, NotificationOutcome::Processed, "code {}", code);
        let record = harness.store.record(&alice()).await.unwrap();
        assert_eq!(record.tier, EntitlementTier::Premium);
        assert_eq!(record.status, Some(SubscriptionStatus::Active));
        assert_eq!(record.expires_at, Some(expires));
        assert_eq!(
            record.last_notification_type,
            Some(NotificationType::from_code(code))
        );
    }
}

#[tokio::test]
async fn hold_downgrades_without_oracle_call() {
    let harness = Harness::with_user().await;

    let outcome = harness.send_lifecycle(5, now_millis()).await;

    assert_eq!(outcome, NotificationOutcome::Processed);
    let record = harness.store.record(&alice()).await.unwrap();
    assert_eq!(record.tier, EntitlementTier::Free);
    assert_eq!(record.status, Some(SubscriptionStatus::OnHold));
    assert!(record.hold_started_at.is_some());
    assert_eq!(harness.oracle.call_count(), 0);
}

#[tokio::test]
async fn cancellation_keeps_premium_until_expiry() {
    let harness = Harness::with_user().await;
    let expires = Timestamp::now().plus_days(12);
    harness
        .oracle
        .set_purchase(TOKEN, MockBillingOracle::paid("GPA.1", expires));

    harness.send_lifecycle(3, now_millis()).await;

    let record = harness.store.record(&alice()).await.unwrap();
    assert_eq!(record.tier, EntitlementTier::Premium);
    assert_eq!(record.status, Some(SubscriptionStatus::Canceled));
    assert_eq!(record.expires_at, Some(expires));
    assert!(!record.auto_renewing);
    assert!(record.canceled_at.is_some());
}

#[tokio::test]
async fn cancellation_after_expiry_downgrades() {
    let harness = Harness::with_user().await;
    harness.oracle.set_purchase(
        TOKEN,
        MockBillingOracle::paid("GPA.1", Timestamp::now().minus_days(1)),
    );

    harness.send_lifecycle(3, now_millis()).await;

    let record = harness.store.record(&alice()).await.unwrap();
    assert_eq!(record.tier, EntitlementTier::Free);
    assert_eq!(record.status, Some(SubscriptionStatus::Canceled));
}

#[tokio::test]
async fn revocation_downgrades_immediately() {
    let harness = Harness::with_user().await;

    harness.send_lifecycle(12, now_millis()).await;

    let record = harness.store.record(&alice()).await.unwrap();
    assert_eq!(record.tier, EntitlementTier::Free);
    assert_eq!(record.status, Some(SubscriptionStatus::Revoked));
    assert!(record.expired_at.is_some());
}

#[tokio::test]
async fn informational_types_are_logged_only() {
    for code in [8, 9, 11] {
        let harness = Harness::with_user().await;
        let before = harness.store.record(&alice()).await.unwrap();

        let outcome = harness.send_lifecycle(code, now_millis()).await;

        assert_eq!(outcome, NotificationOutcome::Processed);
        assert_eq!(harness.store.record(&alice()).await.unwrap(), before);
        let entries = harness.store.audit_entries().await;
        assert_eq!(entries[0].details.as_deref(), Some("Logged only"));
        assert_eq!(harness.oracle.call_count(), 0);
    }
}

#[tokio::test]
async fn unknown_type_is_processed_without_writes() {
    let harness = Harness::with_user().await;
    let before = harness.store.record(&alice()).await.unwrap();

    let outcome = harness.send_lifecycle(99, now_millis()).await;

    assert_eq!(outcome, NotificationOutcome::Processed);
    assert_eq!(harness.store.record(&alice()).await.unwrap(), before);
    let entries = harness.store.audit_entries().await;
    assert_eq!(entries[0].details.as_deref(), Some("Unknown notification type"));
    assert_eq!(entries[0].type_label(), "99");
}

#[tokio::test]
async fn oracle_failure_is_audited_as_error() {
    let harness = Harness::with_user().await;
    harness.oracle.set_error(OracleError::Upstream {
        status: 503,
        message: "backend unavailable".to_string(),
    });

    let outcome = harness.send_lifecycle(2, now_millis()).await;

    assert!(matches!(outcome, NotificationOutcome::Failed(_)));
    let entries = harness.store.audit_entries().await;
    assert_eq!(entries[0].status, AuditStatus::Error);
    assert!(entries[0].details.as_deref().unwrap().contains("503"));
}

// =============================================================================
// Ordering and Audit
// =============================================================================

#[tokio::test]
async fn older_event_does_not_overwrite_newer_state() {
    let harness = Harness::with_user().await;
    let t = now_millis();

    // revoked at t, then a delayed renewal from t - 60s arrives
    harness.send_lifecycle(12, t).await;
    harness
        .oracle
        .set_default_purchase(MockBillingOracle::paid("GPA.1", Timestamp::now().plus_days(30)));
    let outcome = harness.send_lifecycle(2, t - 60_000).await;

    assert_eq!(outcome, NotificationOutcome::Skipped("Stale event".to_string()));
    let record = harness.store.record(&alice()).await.unwrap();
    assert_eq!(record.tier, EntitlementTier::Free);
    assert_eq!(record.status, Some(SubscriptionStatus::Revoked));

    let entries = harness.store.audit_entries().await;
    assert_eq!(entries[1].status, AuditStatus::Skipped);
}

#[tokio::test]
async fn redelivery_of_same_event_is_idempotent() {
    let harness = Harness::with_user().await;
    let t = now_millis();

    assert_eq!(harness.send_lifecycle(5, t).await, NotificationOutcome::Processed);
    assert_eq!(harness.send_lifecycle(5, t).await, NotificationOutcome::Processed);

    let record = harness.store.record(&alice()).await.unwrap();
    assert_eq!(record.status, Some(SubscriptionStatus::OnHold));
}

#[tokio::test]
async fn audit_entries_hold_truncated_token() {
    let harness = Harness::with_user().await;

    harness.send_lifecycle(5, now_millis()).await;

    let entries = harness.store.audit_entries().await;
    let token = entries[0].purchase_token.as_deref().unwrap();
    assert_eq!(token, format!("{}...", &TOKEN[..30]));
    assert_eq!(entries[0].package_name.as_deref(), Some(PACKAGE));
    assert_eq!(entries[0].subscription_id.as_deref(), Some("premium_yearly"));
}
