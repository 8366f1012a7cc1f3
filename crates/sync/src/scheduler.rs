//! Periodic sync task.
//!
//! The startup routine runs the first cycle itself, then spawns
//! [`SyncScheduler::run`], whose first tick fires one interval later.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::orchestrator::SyncOrchestrator;

/// Runs a sync cycle on a fixed interval until cancelled.
pub struct SyncScheduler {
    orchestrator: Arc<SyncOrchestrator>,
    interval: Duration,
}

impl SyncScheduler {
    pub fn new(orchestrator: Arc<SyncOrchestrator>, interval: Duration) -> Self {
        Self {
            orchestrator,
            interval,
        }
    }

    /// Run the scheduling loop. Cancelling `cancel` stops the loop and
    /// interrupts an in-flight cycle at its next chunk boundary.
    pub async fn run(self, cancel: CancellationToken) {
        tracing::info!(interval_secs = self.interval.as_secs(), "Sync scheduler started");

        let mut interval = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Sync scheduler stopping");
                    break;
                }
                _ = interval.tick() => {
                    run_detached(&self.orchestrator, &cancel).await;
                }
            }
        }
    }
}

/// Run one cycle on its own task and wait for it.
///
/// Failures were already logged by the orchestrator. A panic inside the
/// cycle surfaces here as a join error and is logged; the caller's loop
/// keeps going.
pub async fn run_detached(orchestrator: &Arc<SyncOrchestrator>, cancel: &CancellationToken) {
    let task = {
        let orchestrator = Arc::clone(orchestrator);
        let cancel = cancel.clone();
        tokio::spawn(async move { orchestrator.trigger(&cancel).await })
    };

    match task.await {
        Ok(Some(Ok(report))) => {
            tracing::debug!(total_rows = report.total_rows, "Sync cycle finished");
        }
        Ok(Some(Err(_))) | Ok(None) => {}
        Err(e) => {
            tracing::error!(error = %e, "Sync cycle task aborted");
            orchestrator.record_abort(&format!("Sync cycle task aborted: {e}"));
        }
    }
}
