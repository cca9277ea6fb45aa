//! Point-in-time snapshot query handler.

use axum::{extract::State, response::IntoResponse, Json};
use std::sync::atomic::Ordering;
use tracing::{debug, instrument};

use crate::state::SharedState;

/// Handler for `GET /api/snapshot`.
///
/// Always returns 200: provider failures surface as degraded or critical
/// snapshot content rather than HTTP errors, so clients never need to
/// distinguish transport failure from data failure here.
#[instrument(skip(state))]
pub async fn snapshot_handler(State(state): State<SharedState>) -> impl IntoResponse {
    debug!("Processing /api/snapshot request");

    let snapshot = {
        let mut service = state.service.lock().await;
        service.current_snapshot().await
    };
    state.cycles.fetch_add(1, Ordering::Relaxed);

    Json(snapshot)
}
