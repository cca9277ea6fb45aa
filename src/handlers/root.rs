//! Root endpoint handler for the landing page.

use axum::response::IntoResponse;
use tracing::{debug, instrument};

/// Handler for the root `/` endpoint.
#[instrument]
pub async fn root_handler() -> impl IntoResponse {
    debug!("Processing / request");

    let version = env!("CARGO_PKG_VERSION");

    (
        [("Content-Type", "text/plain; charset=utf-8")],
        format!(
            "hostpulse {version}\n\n\
             Endpoints:\n\
             /api/snapshot   Point-in-time metrics snapshot (JSON)\n\
             /api/stream     Live snapshot stream (Server-Sent Events)\n\
             /health         Server health and statistics (text)\n"
        ),
    )
}
