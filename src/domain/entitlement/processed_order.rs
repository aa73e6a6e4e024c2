//! Idempotency ledger entry for verified purchases.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{OrderId, ProductId, Timestamp, UserId};

/// Proof that an order has been granted to a user.
///
/// Written once, inside the same atomic commit as the entitlement grant, and
/// never modified or deleted afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedOrder {
    pub order_id: OrderId,
    pub uid: UserId,
    pub product_id: ProductId,
    pub processed_at: Timestamp,
    pub expires_at: Option<Timestamp>,
}

impl ProcessedOrder {
    pub fn new(
        order_id: OrderId,
        uid: UserId,
        product_id: ProductId,
        expires_at: Option<Timestamp>,
        processed_at: Timestamp,
    ) -> Self {
        Self {
            order_id,
            uid,
            product_id,
            processed_at,
            expires_at,
        }
    }

    pub fn belongs_to(&self, uid: &UserId) -> bool {
        &self.uid == uid
    }
}

/// Outcome of the conditional ledger insert.
#[derive(Debug, Clone, PartialEq)]
pub enum CommitResult {
    /// Ledger entry and entitlement were written together.
    Committed,
    /// Another request claimed the order first; nothing was written.
    AlreadyClaimed(ProcessedOrder),
}
