//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `postgres` - PostgreSQL entitlement store
//! - `memory` - In-memory entitlement store for development and tests
//! - `google_play` - Play Developer API billing oracle
//! - `http` - Axum endpoints
//! - `scheduler` - Periodic expiry sweep

pub mod google_play;
pub mod http;
pub mod memory;
pub mod postgres;
pub mod scheduler;

pub use google_play::{GooglePlayBillingOracle, MockBillingOracle, ServiceAccountTokenSource};
pub use memory::InMemoryEntitlementStore;
pub use scheduler::ExpirySweepScheduler;
