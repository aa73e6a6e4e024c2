//! In-memory adapters for development and tests.

mod entitlement_store;

pub use entitlement_store::InMemoryEntitlementStore;
