//! Entitlement Sync - Google Play subscription entitlement reconciliation
//!
//! This crate keeps a per-user premium entitlement in step with the billing
//! provider: lifecycle notifications drive tier transitions, client purchase
//! verification grants premium exactly once per order, and a periodic sweep
//! downgrades records whose paid period has ended.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
