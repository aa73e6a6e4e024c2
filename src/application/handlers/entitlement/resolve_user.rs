//! Maps a purchase token to the user that owns it.

use std::sync::Arc;

use crate::domain::foundation::{DomainError, PurchaseToken, UserId};
use crate::ports::SubscriptionRepository;

pub struct UserResolver {
    subscriptions: Arc<dyn SubscriptionRepository>,
}

impl UserResolver {
    pub fn new(subscriptions: Arc<dyn SubscriptionRepository>) -> Self {
        Self { subscriptions }
    }

    /// Returns `None` when no record carries the token, e.g. a purchase
    /// made before the client reported it for verification.
    pub async fn resolve(&self, token: &PurchaseToken) -> Result<Option<UserId>, DomainError> {
        self.subscriptions.find_user_by_purchase_token(token).await
    }
}
