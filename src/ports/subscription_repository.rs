//! SubscriptionRepository port - per-user entitlement records.
//!
//! Writes are merge patches. Implementations must make each call atomic with
//! respect to other writers of the same record.

use async_trait::async_trait;

use crate::domain::entitlement::{ApplyOutcome, SubscriptionRecord, SubscriptionUpdate};
use crate::domain::foundation::{DomainError, PurchaseToken, Timestamp, UserId};

#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    async fn find_by_user_id(
        &self,
        uid: &UserId,
    ) -> Result<Option<SubscriptionRecord>, DomainError>;

    /// Resolves the owner of a purchase token.
    ///
    /// Returns `None` when no record carries the token.
    async fn find_user_by_purchase_token(
        &self,
        token: &PurchaseToken,
    ) -> Result<Option<UserId>, DomainError>;

    /// Merges `update` into the record for `uid`, creating it if absent.
    ///
    /// When the update carries an event time older than the record's
    /// `last_event_at`, nothing is written and `ApplyOutcome::Stale` is returned.
    async fn apply(
        &self,
        uid: &UserId,
        update: &SubscriptionUpdate,
    ) -> Result<ApplyOutcome, DomainError>;

    /// Users whose record is premium with `expires_at < now`.
    async fn find_lapsed(&self, now: Timestamp) -> Result<Vec<UserId>, DomainError>;

    /// Downgrades the given users to free in one atomic batch.
    ///
    /// Each record is re-checked against the lapsed predicate inside the batch,
    /// so a record renewed since [`find_lapsed`](Self::find_lapsed) is left alone.
    /// Returns the number of records downgraded.
    async fn expire_lapsed(&self, uids: &[UserId], now: Timestamp) -> Result<u64, DomainError>;
}
