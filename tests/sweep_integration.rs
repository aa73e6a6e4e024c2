//! Integration tests for the expiry sweep.
//!
//! Verifies:
//! 1. Only premium records past their expiry are downgraded
//! 2. A second sweep at the same instant writes nothing
//! 3. The scheduler drives the sweep until shut down

use std::sync::Arc;
use std::time::Duration;

use proptest::prelude::*;
use tokio::sync::watch;

use entitlement_sync::adapters::memory::InMemoryEntitlementStore;
use entitlement_sync::adapters::scheduler::ExpirySweepScheduler;
use entitlement_sync::application::{
    SweepExpiredSubscriptionsCommand, SweepExpiredSubscriptionsHandler,
};
use entitlement_sync::domain::entitlement::{
    EntitlementTier, SubscriptionStatus, SubscriptionUpdate,
};
use entitlement_sync::domain::foundation::{Timestamp, UserId};

// =============================================================================
// Test Infrastructure
// =============================================================================

const NOW_MILLIS: i64 = 1_750_000_000_000;

fn at(millis: i64) -> Timestamp {
    Timestamp::from_millis(millis).unwrap()
}

fn uid(index: usize) -> UserId {
    UserId::new(format!("user-{}", index)).unwrap()
}

async fn seed(
    store: &InMemoryEntitlementStore,
    uid: UserId,
    tier: EntitlementTier,
    expires_at: Option<Timestamp>,
) {
    store
        .put_record(
            SubscriptionUpdate::new(at(0))
                .tier(tier)
                .status(SubscriptionStatus::Canceled)
                .expires_at(expires_at)
                .into_record(uid),
        )
        .await;
}

fn sweeper(store: &InMemoryEntitlementStore) -> SweepExpiredSubscriptionsHandler {
    SweepExpiredSubscriptionsHandler::new(Arc::new(store.clone()))
}

// =============================================================================
// Sweep
// =============================================================================

#[tokio::test]
async fn sweep_downgrades_only_lapsed_premium() {
    let store = InMemoryEntitlementStore::new();
    seed(&store, uid(1), EntitlementTier::Premium, Some(at(NOW_MILLIS - 1))).await;
    seed(&store, uid(2), EntitlementTier::Premium, Some(at(NOW_MILLIS + 1))).await;
    seed(&store, uid(3), EntitlementTier::Premium, None).await;
    seed(&store, uid(4), EntitlementTier::Free, Some(at(NOW_MILLIS - 1))).await;

    let count = sweeper(&store)
        .handle(SweepExpiredSubscriptionsCommand { now: at(NOW_MILLIS) })
        .await
        .unwrap();

    assert_eq!(count, 1);
    let lapsed = store.record(&uid(1)).await.unwrap();
    assert_eq!(lapsed.tier, EntitlementTier::Free);
    assert_eq!(lapsed.expired_at, Some(at(NOW_MILLIS)));
    assert_eq!(lapsed.updated_at, at(NOW_MILLIS));
    assert_eq!(
        store.record(&uid(2)).await.unwrap().tier,
        EntitlementTier::Premium
    );
    assert_eq!(
        store.record(&uid(3)).await.unwrap().tier,
        EntitlementTier::Premium
    );
}

#[tokio::test]
async fn second_sweep_is_a_no_op() {
    let store = InMemoryEntitlementStore::new();
    seed(&store, uid(1), EntitlementTier::Premium, Some(at(NOW_MILLIS - 1))).await;
    let handler = sweeper(&store);
    let cmd = SweepExpiredSubscriptionsCommand { now: at(NOW_MILLIS) };

    assert_eq!(handler.handle(cmd).await.unwrap(), 1);
    let after_first = store.records().await;
    assert_eq!(handler.handle(cmd).await.unwrap(), 0);

    assert_eq!(store.records().await, after_first);
}

#[tokio::test]
async fn scheduler_sweeps_until_shutdown() {
    let store = InMemoryEntitlementStore::new();
    seed(&store, uid(1), EntitlementTier::Premium, Some(at(1_000))).await;
    let scheduler = ExpirySweepScheduler::new(
        Arc::new(sweeper(&store)),
        Duration::from_millis(10),
    );
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let task = tokio::spawn(async move { scheduler.run(shutdown_rx).await });
    tokio::time::sleep(Duration::from_millis(50)).await;
    shutdown_tx.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(1), task)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(
        store.record(&uid(1)).await.unwrap().tier,
        EntitlementTier::Free
    );
}

// =============================================================================
// Properties
// =============================================================================

fn record_strategy() -> impl Strategy<Value = (bool, Option<i64>)> {
    (
        any::<bool>(),
        proptest::option::of(-86_400_000i64..86_400_000),
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn sweep_leaves_no_lapsed_premium(records in proptest::collection::vec(record_strategy(), 0..24)) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        runtime.block_on(async {
            let store = InMemoryEntitlementStore::new();
            let now = at(NOW_MILLIS);
            let mut expected = 0u64;
            for (index, (premium, offset)) in records.iter().enumerate() {
                let tier = if *premium { EntitlementTier::Premium } else { EntitlementTier::Free };
                let expires_at = offset.map(|offset| at(NOW_MILLIS + offset));
                if *premium && offset.map(|offset| offset < 0).unwrap_or(false) {
                    expected += 1;
                }
                seed(&store, uid(index), tier, expires_at).await;
            }
            let before = store.records().await;

            let count = sweeper(&store)
                .handle(SweepExpiredSubscriptionsCommand { now })
                .await
                .unwrap();

            assert_eq!(count, expected);
            for record in store.records().await {
                assert!(!record.is_lapsed(&now));
                let original = before.iter().find(|r| r.user_id == record.user_id).unwrap();
                if !original.is_lapsed(&now) {
                    assert_eq!(&record, original);
                }
            }
        });
    }
}
