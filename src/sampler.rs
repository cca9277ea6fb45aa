//! Periodic collection driver.
//!
//! One task ticks at the configured interval, produces a snapshot and hands
//! it to the broadcaster. This is the only writer driving the service once
//! the server is up; on-demand queries share the same mutex.

use std::sync::atomic::Ordering;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tracing::debug;

use crate::state::SharedState;

/// Runs the collection loop until the task is aborted at shutdown.
pub async fn run(state: SharedState) {
    let interval = Duration::from_secs(state.config.effective_interval_seconds());
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        let snapshot = {
            let mut service = state.service.lock().await;
            service.current_snapshot().await
        };
        state.cycles.fetch_add(1, Ordering::Relaxed);

        let delivered = state.broadcaster.broadcast(&snapshot);
        debug!(
            status = ?snapshot.status,
            subscribers = delivered,
            "collection cycle broadcast"
        );
    }
}
