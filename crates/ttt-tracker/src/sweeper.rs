//! Periodic retention.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use ttt_store::Store;

use crate::host::HostTabs;
use crate::tracker::Tracker;

/// Default time between retention passes.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

const MIN_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// Runs a retention pass now and then every `period` until the handle is
/// aborted.
///
/// A failed pass is logged and retried at the next tick.
pub fn spawn_sweeper<S: Store, H: HostTabs>(
    tracker: Tracker<S, H>,
    period: Duration,
) -> JoinHandle<()> {
    let period = period.max(MIN_SWEEP_INTERVAL);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match tracker.sweep().await {
                Ok(report) => tracing::info!(
                    deleted = report.deleted,
                    pruned_visits = report.pruned_visits,
                    "retention sweep finished"
                ),
                Err(err) => tracing::warn!(error = %err, "retention sweep failed"),
            }
        }
    })
}
