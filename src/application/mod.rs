//! Application layer - Commands and Handlers.
//!
//! This layer orchestrates domain operations and coordinates between ports.

pub mod handlers;

pub use handlers::{
    HandlePlayNotificationCommand, HandlePlayNotificationHandler, NotificationOutcome,
    SweepExpiredSubscriptionsCommand, SweepExpiredSubscriptionsHandler, TransitionRegistry,
    UserResolver, VerifyPurchaseCommand, VerifyPurchaseHandler, VerifyPurchaseResult,
};
