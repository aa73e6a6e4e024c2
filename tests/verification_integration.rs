//! Integration tests for client purchase verification.
//!
//! Verifies through `VerifyPurchaseHandler` with the in-memory store:
//! 1. Paid purchases grant premium and write one ledger entry
//! 2. Replays of an order are idempotent, cross-user replays conflict
//! 3. Unpaid or unknown purchases are rejected without writes
//! 4. Concurrent verification of the same order grants exactly once

use std::sync::Arc;

use entitlement_sync::adapters::google_play::MockBillingOracle;
use entitlement_sync::adapters::memory::InMemoryEntitlementStore;
use entitlement_sync::application::{
    VerifyPurchaseCommand, VerifyPurchaseHandler, VerifyPurchaseResult,
};
use entitlement_sync::domain::entitlement::{
    EntitlementTier, PaymentState, Platform, SubscriptionStatus, VerificationError,
};
use entitlement_sync::domain::foundation::{Timestamp, UserId};
use entitlement_sync::ports::OracleError;

// =============================================================================
// Test Infrastructure
// =============================================================================

struct Harness {
    store: InMemoryEntitlementStore,
    oracle: MockBillingOracle,
    handler: Arc<VerifyPurchaseHandler>,
}

impl Harness {
    fn new() -> Self {
        let store = InMemoryEntitlementStore::new();
        let oracle = MockBillingOracle::new();
        let handler = Arc::new(VerifyPurchaseHandler::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(oracle.clone()),
        ));
        Self {
            store,
            oracle,
            handler,
        }
    }

    async fn verify(&self, uid: &str, token: &str) -> Result<VerifyPurchaseResult, VerificationError> {
        self.handler.handle(command(uid, token)).await
    }
}

fn command(uid: &str, token: &str) -> VerifyPurchaseCommand {
    VerifyPurchaseCommand {
        caller: Some(UserId::new(uid).unwrap()),
        uid: uid.to_string(),
        product_id: "premium_yearly".to_string(),
        purchase_token: token.to_string(),
        platform: "android".to_string(),
    }
}

fn user(uid: &str) -> UserId {
    UserId::new(uid).unwrap()
}

// =============================================================================
// Grants
// =============================================================================

#[tokio::test]
async fn paid_purchase_grants_premium() {
    let harness = Harness::new();
    let expires = Timestamp::now().plus_days(365);
    harness
        .oracle
        .set_purchase("tok-a", MockBillingOracle::paid("GPA.1234", expires));

    let result = harness.verify("alice", "tok-a").await.unwrap();

    assert!(result.valid);
    assert!(!result.already_processed);
    assert_eq!(result.order_id.as_deref(), Some("GPA.1234"));
    assert_eq!(result.expires_at, Some(expires));
    assert_eq!(result.auto_renewing, Some(true));
    assert_eq!(result.price_amount_micros, Some(4_990_000));
    assert_eq!(result.price_currency_code.as_deref(), Some("USD"));

    let record = harness.store.record(&user("alice")).await.unwrap();
    assert_eq!(record.tier, EntitlementTier::Premium);
    assert_eq!(record.status, Some(SubscriptionStatus::Active));
    assert_eq!(record.platform, Some(Platform::Android));
    assert_eq!(record.purchase_token.as_ref().map(|t| t.as_str()), Some("tok-a"));
    assert!(record.verified_at.is_some());

    let orders = harness.store.processed_orders().await;
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].uid, user("alice"));
}

#[tokio::test]
async fn free_trial_grants_premium() {
    let harness = Harness::new();
    let mut trial = MockBillingOracle::paid("GPA.trial", Timestamp::now().plus_days(7));
    trial.payment_state = Some(PaymentState::FreeTrial);
    harness.oracle.set_purchase("tok-a", trial);

    let result = harness.verify("alice", "tok-a").await.unwrap();

    assert!(result.valid);
}

// =============================================================================
// Idempotency
// =============================================================================

#[tokio::test]
async fn replay_by_same_user_reports_already_processed() {
    let harness = Harness::new();
    let expires = Timestamp::now().plus_days(30);
    harness
        .oracle
        .set_purchase("tok-a", MockBillingOracle::paid("GPA.1", expires));

    harness.verify("alice", "tok-a").await.unwrap();
    let before = harness.store.record(&user("alice")).await.unwrap();
    let replay = harness.verify("alice", "tok-a").await.unwrap();

    assert!(replay.valid);
    assert!(replay.already_processed);
    assert_eq!(replay.order_id.as_deref(), Some("GPA.1"));
    assert_eq!(replay.expires_at, Some(expires));
    assert_eq!(replay.auto_renewing, Some(true));
    assert_eq!(harness.store.record(&user("alice")).await.unwrap(), before);
    assert_eq!(harness.store.processed_orders().await.len(), 1);
}

#[tokio::test]
async fn replay_by_other_user_conflicts() {
    let harness = Harness::new();
    harness.oracle.set_default_purchase(MockBillingOracle::paid(
        "GPA.1",
        Timestamp::now().plus_days(30),
    ));

    harness.verify("alice", "tok-a").await.unwrap();
    let err = harness.verify("mallory", "tok-a").await.unwrap_err();

    assert_eq!(err, VerificationError::AlreadyExists);
    assert!(harness.store.record(&user("mallory")).await.is_none());
    let orders = harness.store.processed_orders().await;
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].uid, user("alice"));
}

#[tokio::test]
async fn concurrent_verification_grants_once() {
    let harness = Harness::new();
    harness.oracle.set_default_purchase(MockBillingOracle::paid(
        "GPA.race",
        Timestamp::now().plus_days(30),
    ));

    let first = tokio::spawn({
        let handler = harness.handler.clone();
        async move { handler.handle(command("alice", "tok-a")).await }
    });
    let second = tokio::spawn({
        let handler = harness.handler.clone();
        async move { handler.handle(command("alice", "tok-a")).await }
    });
    let first = first.await.unwrap().unwrap();
    let second = second.await.unwrap().unwrap();

    assert!(first.valid && second.valid);
    assert_eq!(
        [first.already_processed, second.already_processed]
            .iter()
            .filter(|processed| **processed)
            .count(),
        1
    );
    assert_eq!(harness.store.processed_orders().await.len(), 1);
}

// =============================================================================
// Rejections
// =============================================================================

#[tokio::test]
async fn pending_payment_is_rejected_without_writes() {
    let harness = Harness::new();
    let mut pending = MockBillingOracle::paid("GPA.1", Timestamp::now().plus_days(30));
    pending.payment_state = Some(PaymentState::Pending);
    harness.oracle.set_purchase("tok-a", pending);

    let result = harness.verify("alice", "tok-a").await.unwrap();

    assert!(!result.valid);
    assert_eq!(result.error.as_deref(), Some("payment not completed or pending"));
    assert!(harness.store.records().await.is_empty());
    assert!(harness.store.processed_orders().await.is_empty());
}

#[tokio::test]
async fn absent_payment_state_is_rejected() {
    let harness = Harness::new();
    let mut lapsed = MockBillingOracle::paid("GPA.1", Timestamp::now().minus_days(3));
    lapsed.payment_state = None;
    harness.oracle.set_purchase("tok-a", lapsed);

    let result = harness.verify("alice", "tok-a").await.unwrap();

    assert!(!result.valid);
    assert!(harness.store.records().await.is_empty());
}

#[tokio::test]
async fn oracle_rejections_map_to_client_messages() {
    let cases = [
        (OracleError::NotFound, "purchase not found"),
        (OracleError::Gone, "purchase canceled or expired"),
        (
            OracleError::Unauthorized("invalid_grant".into()),
            "billing API authentication failure",
        ),
        (
            OracleError::Forbidden("no access".into()),
            "insufficient permissions on the service account",
        ),
        (
            OracleError::CredentialsUnavailable("no such file".into()),
            "service-account key file missing",
        ),
    ];

    for (error, message) in cases {
        let harness = Harness::new();
        harness.oracle.set_error(error);

        let result = harness.verify("alice", "tok-a").await.unwrap();

        assert!(!result.valid);
        assert_eq!(result.error.as_deref(), Some(message));
        assert!(harness.store.records().await.is_empty());
    }
}

#[tokio::test]
async fn transport_failure_is_internal() {
    let harness = Harness::new();
    harness
        .oracle
        .set_error(OracleError::Transport("connection reset".into()));

    let err = harness.verify("alice", "tok-a").await.unwrap_err();

    assert_eq!(err.code(), "internal");
}

#[tokio::test]
async fn ios_is_not_implemented() {
    let harness = Harness::new();
    let mut cmd = command("alice", "tok-a");
    cmd.platform = "ios".to_string();

    let err = harness.handler.handle(cmd).await.unwrap_err();

    assert_eq!(err, VerificationError::Unimplemented("ios".to_string()));
    assert_eq!(harness.oracle.call_count(), 0);
}

#[tokio::test]
async fn mismatched_caller_is_denied_before_oracle() {
    let harness = Harness::new();
    let mut cmd = command("alice", "tok-a");
    cmd.caller = Some(user("mallory"));

    let err = harness.handler.handle(cmd).await.unwrap_err();

    assert_eq!(err, VerificationError::PermissionDenied);
    assert_eq!(harness.oracle.call_count(), 0);
}
