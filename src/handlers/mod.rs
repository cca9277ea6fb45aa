//! HTTP endpoint handlers.
//!
//! This module contains all HTTP request handlers for the server:
//! the landing page, the point-in-time snapshot query, the SSE stream
//! and the health endpoint.

mod health;
mod root;
mod snapshot;
mod stream;

pub use health::health_handler;
pub use root::root_handler;
pub use snapshot::snapshot_handler;
pub use stream::stream_handler;
