//! SweepExpiredSubscriptionsHandler - Downgrades premium records past their expiry.
//!
//! Backstop for missed or out-of-order expiry notifications.

use std::sync::Arc;

use crate::domain::foundation::{DomainError, Timestamp};
use crate::ports::SubscriptionRepository;

#[derive(Debug, Clone, Copy)]
pub struct SweepExpiredSubscriptionsCommand {
    pub now: Timestamp,
}

pub struct SweepExpiredSubscriptionsHandler {
    subscriptions: Arc<dyn SubscriptionRepository>,
}

impl SweepExpiredSubscriptionsHandler {
    pub fn new(subscriptions: Arc<dyn SubscriptionRepository>) -> Self {
        Self { subscriptions }
    }

    /// Returns the number of records downgraded.
    pub async fn handle(&self, cmd: SweepExpiredSubscriptionsCommand) -> Result<u64, DomainError> {
        let lapsed = self.subscriptions.find_lapsed(cmd.now).await?;
        if lapsed.is_empty() {
            tracing::debug!("No lapsed subscriptions");
            return Ok(0);
        }

        let downgraded = self.subscriptions.expire_lapsed(&lapsed, cmd.now).await?;
        tracing::info!(
            candidates = lapsed.len(),
            downgraded,
            "Expired lapsed premium subscriptions"
        );
        Ok(downgraded)
    }
}
