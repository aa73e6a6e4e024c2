//! ProcessedOrderRepository port - idempotency ledger for verified purchases.
//!
//! The ledger guarantees an order grants an entitlement to at most one user.
//! Implementations should rely on a uniqueness constraint on the order id
//! rather than a read-then-write check.

use async_trait::async_trait;

use crate::domain::entitlement::{CommitResult, ProcessedOrder, SubscriptionUpdate};
use crate::domain::foundation::{DomainError, OrderId};

#[async_trait]
pub trait ProcessedOrderRepository: Send + Sync {
    async fn find_by_order_id(
        &self,
        order_id: &OrderId,
    ) -> Result<Option<ProcessedOrder>, DomainError>;

    /// Inserts `order` and merges `update` into the owner's subscription record
    /// as one atomic unit.
    ///
    /// If the order id is already present nothing is written and the existing
    /// entry is returned as `CommitResult::AlreadyClaimed`.
    async fn commit_activation(
        &self,
        order: &ProcessedOrder,
        update: &SubscriptionUpdate,
    ) -> Result<CommitResult, DomainError>;
}
