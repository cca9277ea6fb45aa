//! Error taxonomy for collection and streaming.
//!
//! Collection-side failures (`CollectError`) are fully absorbed by the
//! orchestrator and converted into per-metric statuses; they never reach the
//! broadcast layer or the wire. Transport failures (`TransportError`) exist
//! only on the subscriber side and drive the reconnection state machine.

use thiserror::Error;

/// Outcome of a guarded collector call that did not produce a value.
///
/// A collector that legitimately has nothing to report (e.g. a delta-based
/// metric on its first sample) is not an error; it returns `Ok(None)` from
/// the provider and is classified by the orchestrator.
#[derive(Debug, Error)]
pub enum CollectError {
    /// The guarded operation exceeded its deadline.
    #[error("Timeout after {deadline_ms}ms")]
    Timeout { deadline_ms: u64 },

    /// The provider failed for a non-timeout reason.
    #[error("{0}")]
    Provider(String),
}

impl CollectError {
    /// True if this error came from the timeout guard rather than the provider.
    pub fn is_timeout(&self) -> bool {
        matches!(self, CollectError::Timeout { .. })
    }
}

/// Subscriber-side connection failure.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The streaming connection could not be opened.
    #[error("connect failed: {0}")]
    Connect(String),

    /// The server refused the stream with a non-success status code.
    #[error("server returned status {0}")]
    Status(u16),

    /// An established stream was interrupted.
    #[error("stream interrupted: {0}")]
    Interrupted(String),
}
