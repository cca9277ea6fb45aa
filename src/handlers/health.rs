//! Health check endpoint handler.
//!
//! This module provides the `/health` endpoint handler that returns
//! server liveness, collection progress and subscriber statistics.

use axum::{extract::State, response::IntoResponse};
use std::sync::atomic::Ordering;
use tracing::{debug, instrument};

// Time conversion constants
const SECONDS_PER_HOUR: f64 = 3600.0;
const MINUTES_PER_HOUR: f64 = 60.0;
const HOURS_PER_DAY: f64 = 24.0;

use crate::state::SharedState;

/// Handler for the /health endpoint.
#[instrument(skip(state))]
pub async fn health_handler(State(state): State<SharedState>) -> impl IntoResponse {
    debug!("Processing /health request");

    let uptime_seconds = state.start_time.elapsed().as_secs();
    let uptime_hours = uptime_seconds as f64 / SECONDS_PER_HOUR;
    let uptime_str = if uptime_hours < 1.0 {
        format!("{:.1} minutes", uptime_hours * MINUTES_PER_HOUR)
    } else if uptime_hours < HOURS_PER_DAY {
        format!("{:.1} hours", uptime_hours)
    } else {
        format!("{:.1} days", uptime_hours / HOURS_PER_DAY)
    };

    let cycles = state.cycles.load(Ordering::Relaxed);
    let subscribers = state.broadcaster.connection_count();

    (
        [("Content-Type", "text/plain; charset=utf-8")],
        format!(
            "OK\n\nUptime: {uptime_str}\nCollection cycles: {cycles}\nActive subscribers: {subscribers}\n"
        ),
    )
}
