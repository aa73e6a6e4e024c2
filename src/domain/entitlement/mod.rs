//! Entitlement domain - subscription state kept in sync with the billing provider.
//!
//! # Module Structure
//!
//! - `tier` / `status` / `platform` - Enumerations stored on the record
//! - `record` - Per-user subscription record and merge-patch updates
//! - `processed_order` - Idempotency ledger for verified orders
//! - `notification` - Provider lifecycle notifications and their dispatch categories
//! - `purchase` - Authoritative purchase snapshot from the billing oracle
//! - `audit` - Notification audit log entries
//! - `errors` - Verification error taxonomy

mod audit;
mod errors;
mod notification;
mod platform;
mod processed_order;
mod purchase;
mod record;
mod status;
mod tier;

pub use audit::{AuditStatus, NotificationLogEntry};
pub use errors::VerificationError;
pub use notification::{
    DeveloperNotification, NotificationCategory, NotificationDecodeError, NotificationType,
    SubscriptionNotification, TestNotification,
};
pub use platform::Platform;
pub use processed_order::{CommitResult, ProcessedOrder};
pub use purchase::{PaymentState, PurchaseSnapshot};
pub use record::{ApplyOutcome, SubscriptionRecord, SubscriptionUpdate};
pub use status::SubscriptionStatus;
pub use tier::EntitlementTier;
