//! hostpulse — resilient host metrics sampling and streaming.
//!
//! The pipeline: six independent collectors are run concurrently each cycle,
//! every call bounded by a timeout guard; failures fall back to the last
//! successfully observed value per metric. Each cycle records one sample in
//! a fixed 60-slot history window and derives a single system-health status.
//! Snapshots fan out over Server-Sent Events to any number of subscribers,
//! and the subscriber client reconnects with exponential backoff until a
//! circuit breaker stops automatic attempts.
//!
//! # Modules
//!
//! - [`timeout`]: deadline guard applied to every provider call
//! - [`providers`]: the capability interface and the Linux /proc provider
//! - [`collector`]: concurrent orchestration and outcome classification
//! - [`history`]: the fixed-window history ring
//! - [`snapshot`]: snapshot assembly and the global health verdict
//! - [`broadcast`]: subscriber registry, fan-out and keep-alives
//! - [`sse`], [`client`]: wire decoding and the reconnecting subscriber

pub mod broadcast;
pub mod cli;
pub mod client;
pub mod collector;
pub mod config;
pub mod error;
pub mod handlers;
pub mod history;
pub mod providers;
pub mod sampler;
pub mod snapshot;
pub mod sse;
pub mod state;
pub mod timeout;

// Re-export main types for convenience
pub use broadcast::Broadcaster;
pub use client::{ClientHandle, ConnectionStatus, ReconnectPolicy, Reconnector, SseClient};
pub use collector::{MetricResult, MetricStatus, Orchestrator};
pub use history::{HistoryBuffer, HistorySample, HISTORY_CAPACITY};
pub use providers::{MetricsProvider, ProcProvider};
pub use snapshot::{Snapshot, SnapshotService, SystemStatus};
