//! Live snapshot stream handler (Server-Sent Events).

use std::convert::Infallible;
use std::sync::atomic::Ordering;

use axum::{
    extract::State,
    http::header,
    response::sse::{Event, Sse},
    response::IntoResponse,
};
use futures_util::stream::{self, Stream, StreamExt};
use tracing::{debug, instrument, warn};

use crate::broadcast::Frame;
use crate::state::SharedState;

/// Handler for `GET /api/stream`.
///
/// Registers the connection with the broadcaster, pushes one snapshot
/// immediately, then relays broadcast frames until the client goes away.
/// Keep-alive comment frames arrive on the same channel; dropping the
/// response stream unregisters the connection.
#[instrument(skip(state))]
pub async fn stream_handler(State(state): State<SharedState>) -> impl IntoResponse {
    debug!("Processing /api/stream request");

    // Register before producing the initial snapshot so a broadcast cycle
    // landing in between cannot be missed.
    let subscription = state.broadcaster.register();

    let initial = {
        let mut service = state.service.lock().await;
        service.current_snapshot().await
    };
    state.cycles.fetch_add(1, Ordering::Relaxed);

    let first = match serde_json::to_string(&initial) {
        Ok(json) => Some(Ok::<_, Infallible>(Event::default().data(json))),
        Err(e) => {
            warn!("failed to serialize initial snapshot: {}", e);
            None
        }
    };

    let live = stream::unfold(subscription, |mut subscription| async move {
        match subscription.recv().await {
            Some(Frame::Data(payload)) => {
                let event = Event::default().data(payload.as_str());
                Some((Ok::<_, Infallible>(event), subscription))
            }
            Some(Frame::KeepAlive) => {
                let event = Event::default().comment("keep-alive");
                Some((Ok::<_, Infallible>(event), subscription))
            }
            None => None,
        }
    });

    let frames: BoxedEventStream = Box::pin(stream::iter(first).chain(live));

    (
        [(header::CACHE_CONTROL, "no-cache")],
        Sse::new(frames),
    )
}

type BoxedEventStream =
    std::pin::Pin<Box<dyn Stream<Item = Result<Event, Infallible>> + Send>>;
