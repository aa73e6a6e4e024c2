//! ExpirySweepScheduler - Background task running the expiry sweep on an interval.
//!
//! The first sweep runs immediately on start, then once per interval. A
//! failed sweep is logged and retried on the next tick.
//!
//! ## Graceful Shutdown
//!
//! The loop exits when the shutdown watch channel flips to `true`. A sweep
//! already in progress completes first.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{self, MissedTickBehavior};

use crate::application::{SweepExpiredSubscriptionsCommand, SweepExpiredSubscriptionsHandler};
use crate::domain::foundation::{DomainError, Timestamp};

pub struct ExpirySweepScheduler {
    handler: Arc<SweepExpiredSubscriptionsHandler>,
    interval: Duration,
}

impl ExpirySweepScheduler {
    pub fn new(handler: Arc<SweepExpiredSubscriptionsHandler>, interval: Duration) -> Self {
        Self { handler, interval }
    }

    /// Runs until `shutdown` signals `true` or its sender is dropped.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(interval_secs = self.interval.as_secs(), "Expiry sweeper started");

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        tracing::info!("Expiry sweeper stopped");
                        return;
                    }
                }

                _ = ticker.tick() => {
                    if let Err(e) = self.sweep_once().await {
                        tracing::error!(error = %e, "Expiry sweep failed; retrying next interval");
                    }
                }
            }
        }
    }

    /// Run exactly one sweep (for testing and manual triggers).
    pub async fn sweep_once(&self) -> Result<u64, DomainError> {
        self.handler
            .handle(SweepExpiredSubscriptionsCommand {
                now: Timestamp::now(),
            })
            .await
    }
}
