//! Application state shared between HTTP handlers and the sampler task.

use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Mutex;

use crate::broadcast::Broadcaster;
use crate::config::Config;
use crate::providers::ProcProvider;
use crate::snapshot::SnapshotService;

/// Type alias for shared application state.
pub type SharedState = Arc<AppState>;

/// Global application state shared across requests and the sampler task.
pub struct AppState {
    /// The snapshot service mutates its history and last-known store on
    /// every call; the mutex serializes the sampler tick and on-demand
    /// queries onto one logical sequence.
    pub service: Mutex<SnapshotService<ProcProvider>>,
    pub broadcaster: Arc<Broadcaster>,
    pub config: Arc<Config>,
    /// Completed collection cycles since startup.
    pub cycles: AtomicU64,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}
