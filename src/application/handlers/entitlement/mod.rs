//! Entitlement handlers - Lifecycle notifications, purchase verification, expiry sweep.

mod handle_play_notification;
mod resolve_user;
mod sweep_expired_subscriptions;
mod transitions;
mod verify_purchase;

pub use handle_play_notification::{
    HandlePlayNotificationCommand, HandlePlayNotificationHandler, NotificationOutcome,
};
pub use resolve_user::UserResolver;
pub use sweep_expired_subscriptions::{
    SweepExpiredSubscriptionsCommand, SweepExpiredSubscriptionsHandler,
};
pub use transitions::{
    ActivationHandler, CancellationHandler, GracePeriodHandler, HoldHandler, TerminationHandler,
    TransitionContext, TransitionError, TransitionHandler, TransitionRegistry,
};
pub use verify_purchase::{VerifyPurchaseCommand, VerifyPurchaseHandler, VerifyPurchaseResult};
