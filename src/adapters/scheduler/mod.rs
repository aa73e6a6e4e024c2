//! Background schedulers.

mod expiry_sweep_scheduler;

pub use expiry_sweep_scheduler::ExpirySweepScheduler;
