//! In-memory entitlement store.
//!
//! Implements every store port over a single `RwLock`, so each port call is
//! atomic with respect to every other. Useful for:
//! - Local development without PostgreSQL
//! - Handler and HTTP tests
//!
//! Nothing is persisted across restarts.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::entitlement::{
    ApplyOutcome, CommitResult, EntitlementTier, NotificationLogEntry, ProcessedOrder,
    SubscriptionRecord, SubscriptionUpdate,
};
use crate::domain::foundation::{DomainError, OrderId, PurchaseToken, Timestamp, UserId};
use crate::ports::{NotificationLog, ProcessedOrderRepository, SubscriptionRepository};

#[derive(Default)]
struct StoreState {
    subscriptions: HashMap<UserId, SubscriptionRecord>,
    processed_orders: HashMap<OrderId, ProcessedOrder>,
    notification_log: Vec<NotificationLogEntry>,
}

impl StoreState {
    fn apply(&mut self, uid: &UserId, update: &SubscriptionUpdate) -> ApplyOutcome {
        if update.is_stale_for(self.subscriptions.get(uid)) {
            return ApplyOutcome::Stale;
        }
        match self.subscriptions.get_mut(uid) {
            Some(record) => record.apply(update),
            None => {
                self.subscriptions
                    .insert(uid.clone(), update.into_record(uid.clone()));
            }
        }
        ApplyOutcome::Applied
    }
}

/// Entitlement store held entirely in process memory.
#[derive(Clone, Default)]
pub struct InMemoryEntitlementStore {
    state: Arc<RwLock<StoreState>>,
    failing: Arc<AtomicBool>,
}

impl InMemoryEntitlementStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent store call fail with a database error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Stores `record` as-is, replacing any existing record for the user.
    pub async fn put_record(&self, record: SubscriptionRecord) {
        let mut state = self.state.write().await;
        state.subscriptions.insert(record.user_id.clone(), record);
    }

    pub async fn record(&self, uid: &UserId) -> Option<SubscriptionRecord> {
        self.state.read().await.subscriptions.get(uid).cloned()
    }

    pub async fn records(&self) -> Vec<SubscriptionRecord> {
        self.state.read().await.subscriptions.values().cloned().collect()
    }

    pub async fn processed_orders(&self) -> Vec<ProcessedOrder> {
        self.state
            .read()
            .await
            .processed_orders
            .values()
            .cloned()
            .collect()
    }

    /// Audit entries in append order.
    pub async fn audit_entries(&self) -> Vec<NotificationLogEntry> {
        self.state.read().await.notification_log.clone()
    }

    fn check_available(&self) -> Result<(), DomainError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(DomainError::database("in-memory store unavailable"));
        }
        Ok(())
    }
}

#[async_trait]
impl SubscriptionRepository for InMemoryEntitlementStore {
    async fn find_by_user_id(
        &self,
        uid: &UserId,
    ) -> Result<Option<SubscriptionRecord>, DomainError> {
        self.check_available()?;
        Ok(self.state.read().await.subscriptions.get(uid).cloned())
    }

    async fn find_user_by_purchase_token(
        &self,
        token: &PurchaseToken,
    ) -> Result<Option<UserId>, DomainError> {
        self.check_available()?;
        let state = self.state.read().await;
        Ok(state
            .subscriptions
            .values()
            .find(|record| record.purchase_token.as_ref() == Some(token))
            .map(|record| record.user_id.clone()))
    }

    async fn apply(
        &self,
        uid: &UserId,
        update: &SubscriptionUpdate,
    ) -> Result<ApplyOutcome, DomainError> {
        self.check_available()?;
        Ok(self.state.write().await.apply(uid, update))
    }

    async fn find_lapsed(&self, now: Timestamp) -> Result<Vec<UserId>, DomainError> {
        self.check_available()?;
        let state = self.state.read().await;
        Ok(state
            .subscriptions
            .values()
            .filter(|record| record.is_lapsed(&now))
            .map(|record| record.user_id.clone())
            .collect())
    }

    async fn expire_lapsed(&self, uids: &[UserId], now: Timestamp) -> Result<u64, DomainError> {
        self.check_available()?;
        let mut state = self.state.write().await;
        let downgrade = SubscriptionUpdate::new(now)
            .tier(EntitlementTier::Free)
            .expired_at(now);

        let mut count = 0;
        for uid in uids {
            if let Some(record) = state.subscriptions.get_mut(uid) {
                if record.is_lapsed(&now) {
                    record.apply(&downgrade);
                    count += 1;
                }
            }
        }
        Ok(count)
    }
}

#[async_trait]
impl ProcessedOrderRepository for InMemoryEntitlementStore {
    async fn find_by_order_id(
        &self,
        order_id: &OrderId,
    ) -> Result<Option<ProcessedOrder>, DomainError> {
        self.check_available()?;
        Ok(self.state.read().await.processed_orders.get(order_id).cloned())
    }

    async fn commit_activation(
        &self,
        order: &ProcessedOrder,
        update: &SubscriptionUpdate,
    ) -> Result<CommitResult, DomainError> {
        self.check_available()?;
        let mut state = self.state.write().await;
        if let Some(existing) = state.processed_orders.get(&order.order_id) {
            return Ok(CommitResult::AlreadyClaimed(existing.clone()));
        }
        state
            .processed_orders
            .insert(order.order_id.clone(), order.clone());
        state.apply(&order.uid, update);
        Ok(CommitResult::Committed)
    }
}

#[async_trait]
impl NotificationLog for InMemoryEntitlementStore {
    async fn append(&self, entry: &NotificationLogEntry) -> Result<(), DomainError> {
        self.check_available()?;
        self.state.write().await.notification_log.push(entry.clone());
        Ok(())
    }
}
