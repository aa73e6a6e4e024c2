//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (identifiers, timestamps, errors)
//! - `entitlement` - Subscription records, lifecycle notifications, order ledger

pub mod entitlement;
pub mod foundation;
