//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Entitlement Store Ports
//!
//! - `SubscriptionRepository` - Per-user subscription records (merge writes, sweep batches)
//! - `ProcessedOrderRepository` - Order idempotency ledger with atomic activation commit
//! - `NotificationLog` - Append-only notification audit trail
//!
//! ## Provider Ports
//!
//! - `BillingOracle` - Authoritative purchase state from the billing provider

mod billing_oracle;
mod notification_log;
mod processed_order_repository;
mod subscription_repository;

pub use billing_oracle::{BillingOracle, OracleError};
pub use notification_log::NotificationLog;
pub use processed_order_repository::ProcessedOrderRepository;
pub use subscription_repository::SubscriptionRepository;
