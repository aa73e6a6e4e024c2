//! Application handlers.
//!
//! Command handlers that orchestrate domain operations over the ports.

pub mod entitlement;

pub use entitlement::{
    HandlePlayNotificationCommand, HandlePlayNotificationHandler, NotificationOutcome,
    SweepExpiredSubscriptionsCommand, SweepExpiredSubscriptionsHandler, TransitionRegistry,
    UserResolver, VerifyPurchaseCommand, VerifyPurchaseHandler, VerifyPurchaseResult,
};
