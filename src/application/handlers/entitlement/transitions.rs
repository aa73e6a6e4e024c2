//! Subscription lifecycle transitions.
//!
//! Each handler owns one [`NotificationCategory`] and turns a notification
//! into a [`SubscriptionUpdate`]. Handlers that need expiry or renewal data
//! ask the billing oracle; notification payloads carry neither.
//!
//! | Category | Oracle | Tier | Status |
//! |----------|--------|------|--------|
//! | Activation | yes | premium | active |
//! | GracePeriod | yes | premium | grace_period |
//! | Hold | no | free | on_hold / paused |
//! | Cancellation | yes | premium until expiry, then free | canceled |
//! | Termination | no | free | expired / revoked |

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::entitlement::{
    ApplyOutcome, EntitlementTier, NotificationCategory, NotificationType, PurchaseSnapshot,
    SubscriptionNotification, SubscriptionStatus, SubscriptionUpdate,
};
use crate::domain::foundation::{DomainError, ProductId, Timestamp, UserId, ValidationError};
use crate::ports::{BillingOracle, OracleError, SubscriptionRepository};

/// Errors raised while applying a transition.
#[derive(Debug, Clone, Error)]
pub enum TransitionError {
    #[error("billing oracle: {0}")]
    Oracle(#[from] OracleError),

    #[error("store: {0}")]
    Store(#[from] DomainError),

    #[error("invalid notification: {0}")]
    InvalidNotification(#[from] ValidationError),
}

/// Everything a handler needs to know about one notification.
#[derive(Debug, Clone)]
pub struct TransitionContext<'a> {
    pub uid: &'a UserId,
    pub notification: &'a SubscriptionNotification,
    /// Provider event time, used to order writes.
    pub event_at: Option<Timestamp>,
    pub now: Timestamp,
}

impl TransitionContext<'_> {
    fn kind(&self) -> NotificationType {
        self.notification.notification_type
    }

    fn product_id(&self) -> Result<ProductId, ValidationError> {
        ProductId::new(self.notification.subscription_id.clone())
    }

    /// Patch stamped with this notification's type and event time.
    fn update(&self) -> SubscriptionUpdate {
        SubscriptionUpdate::new(self.now).from_notification(self.kind(), self.event_at)
    }
}

#[async_trait]
pub trait TransitionHandler: Send + Sync {
    fn handles(&self) -> NotificationCategory;

    async fn handle(&self, ctx: &TransitionContext<'_>) -> Result<ApplyOutcome, TransitionError>;
}

async fn fetch_purchase(
    oracle: &dyn BillingOracle,
    ctx: &TransitionContext<'_>,
) -> Result<PurchaseSnapshot, TransitionError> {
    let product_id = ctx.product_id()?;
    let snapshot = oracle
        .get_subscription(&product_id, &ctx.notification.purchase_token)
        .await?;
    Ok(snapshot)
}

// ════════════════════════════════════════════════════════════════════════════════
// Oracle-backed transitions
// ════════════════════════════════════════════════════════════════════════════════

/// Purchased, renewed, recovered, restarted.
pub struct ActivationHandler {
    subscriptions: Arc<dyn SubscriptionRepository>,
    oracle: Arc<dyn BillingOracle>,
}

impl ActivationHandler {
    pub fn new(
        subscriptions: Arc<dyn SubscriptionRepository>,
        oracle: Arc<dyn BillingOracle>,
    ) -> Self {
        Self {
            subscriptions,
            oracle,
        }
    }
}

#[async_trait]
impl TransitionHandler for ActivationHandler {
    fn handles(&self) -> NotificationCategory {
        NotificationCategory::Activation
    }

    async fn handle(&self, ctx: &TransitionContext<'_>) -> Result<ApplyOutcome, TransitionError> {
        let purchase = fetch_purchase(self.oracle.as_ref(), ctx).await?;

        let update = ctx
            .update()
            .tier(EntitlementTier::Premium)
            .status(SubscriptionStatus::Active)
            .product_id(ctx.product_id()?)
            .purchase_token(ctx.notification.purchase_token.clone())
            .auto_renewing(purchase.auto_renewing)
            .expires_at(purchase.expires_at);

        Ok(self.subscriptions.apply(ctx.uid, &update).await?)
    }
}

/// Renewal payment failed; access continues while the provider retries.
pub struct GracePeriodHandler {
    subscriptions: Arc<dyn SubscriptionRepository>,
    oracle: Arc<dyn BillingOracle>,
}

impl GracePeriodHandler {
    pub fn new(
        subscriptions: Arc<dyn SubscriptionRepository>,
        oracle: Arc<dyn BillingOracle>,
    ) -> Self {
        Self {
            subscriptions,
            oracle,
        }
    }
}

#[async_trait]
impl TransitionHandler for GracePeriodHandler {
    fn handles(&self) -> NotificationCategory {
        NotificationCategory::GracePeriod
    }

    async fn handle(&self, ctx: &TransitionContext<'_>) -> Result<ApplyOutcome, TransitionError> {
        let purchase = fetch_purchase(self.oracle.as_ref(), ctx).await?;

        let update = ctx
            .update()
            .tier(EntitlementTier::Premium)
            .status(SubscriptionStatus::GracePeriod)
            .expires_at(purchase.expires_at);

        Ok(self.subscriptions.apply(ctx.uid, &update).await?)
    }
}

/// Auto-renew turned off. The user keeps premium for the paid period.
pub struct CancellationHandler {
    subscriptions: Arc<dyn SubscriptionRepository>,
    oracle: Arc<dyn BillingOracle>,
}

impl CancellationHandler {
    pub fn new(
        subscriptions: Arc<dyn SubscriptionRepository>,
        oracle: Arc<dyn BillingOracle>,
    ) -> Self {
        Self {
            subscriptions,
            oracle,
        }
    }
}

#[async_trait]
impl TransitionHandler for CancellationHandler {
    fn handles(&self) -> NotificationCategory {
        NotificationCategory::Cancellation
    }

    async fn handle(&self, ctx: &TransitionContext<'_>) -> Result<ApplyOutcome, TransitionError> {
        let purchase = fetch_purchase(self.oracle.as_ref(), ctx).await?;

        let tier = if purchase.is_unexpired_at(&ctx.now) {
            EntitlementTier::Premium
        } else {
            EntitlementTier::Free
        };

        let update = ctx
            .update()
            .tier(tier)
            .status(SubscriptionStatus::Canceled)
            .auto_renewing(false)
            .expires_at(purchase.expires_at)
            .canceled_at(ctx.now);

        Ok(self.subscriptions.apply(ctx.uid, &update).await?)
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Payload-only transitions
// ════════════════════════════════════════════════════════════════════════════════

/// Account hold or pause: access suspended immediately.
pub struct HoldHandler {
    subscriptions: Arc<dyn SubscriptionRepository>,
}

impl HoldHandler {
    pub fn new(subscriptions: Arc<dyn SubscriptionRepository>) -> Self {
        Self { subscriptions }
    }
}

#[async_trait]
impl TransitionHandler for HoldHandler {
    fn handles(&self) -> NotificationCategory {
        NotificationCategory::Hold
    }

    async fn handle(&self, ctx: &TransitionContext<'_>) -> Result<ApplyOutcome, TransitionError> {
        let status = match ctx.kind() {
            NotificationType::Paused => SubscriptionStatus::Paused,
            _ => SubscriptionStatus::OnHold,
        };

        let update = ctx
            .update()
            .tier(EntitlementTier::Free)
            .status(status)
            .hold_started_at(ctx.now);

        Ok(self.subscriptions.apply(ctx.uid, &update).await?)
    }
}

/// Expired or revoked: the subscription is over.
pub struct TerminationHandler {
    subscriptions: Arc<dyn SubscriptionRepository>,
}

impl TerminationHandler {
    pub fn new(subscriptions: Arc<dyn SubscriptionRepository>) -> Self {
        Self { subscriptions }
    }
}

#[async_trait]
impl TransitionHandler for TerminationHandler {
    fn handles(&self) -> NotificationCategory {
        NotificationCategory::Termination
    }

    async fn handle(&self, ctx: &TransitionContext<'_>) -> Result<ApplyOutcome, TransitionError> {
        let status = match ctx.kind() {
            NotificationType::Revoked => SubscriptionStatus::Revoked,
            _ => SubscriptionStatus::Expired,
        };

        let update = ctx
            .update()
            .tier(EntitlementTier::Free)
            .status(status)
            .auto_renewing(false)
            .expired_at(ctx.now);

        Ok(self.subscriptions.apply(ctx.uid, &update).await?)
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Registry
// ════════════════════════════════════════════════════════════════════════════════

/// Maps notification categories to their handler.
#[derive(Default)]
pub struct TransitionRegistry {
    handlers: HashMap<NotificationCategory, Arc<dyn TransitionHandler>>,
}

impl TransitionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the five lifecycle handlers.
    pub fn standard(
        subscriptions: Arc<dyn SubscriptionRepository>,
        oracle: Arc<dyn BillingOracle>,
    ) -> Self {
        Self::new()
            .register(Arc::new(ActivationHandler::new(
                subscriptions.clone(),
                oracle.clone(),
            )))
            .register(Arc::new(GracePeriodHandler::new(
                subscriptions.clone(),
                oracle.clone(),
            )))
            .register(Arc::new(HoldHandler::new(subscriptions.clone())))
            .register(Arc::new(CancellationHandler::new(
                subscriptions.clone(),
                oracle,
            )))
            .register(Arc::new(TerminationHandler::new(subscriptions)))
    }

    /// Adds `handler`, replacing any handler for the same category.
    pub fn register(mut self, handler: Arc<dyn TransitionHandler>) -> Self {
        self.handlers.insert(handler.handles(), handler);
        self
    }

    pub fn get(&self, category: NotificationCategory) -> Option<&dyn TransitionHandler> {
        self.handlers.get(&category).map(|handler| handler.as_ref())
    }
}
