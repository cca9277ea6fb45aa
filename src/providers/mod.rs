//! Metric providers and the capability interface the orchestrator consumes.
//!
//! A provider exposes one method per metric kind, each returning either a
//! value, `None` (nothing to report yet, e.g. a delta-based metric on its
//! first sample), or a failure. The orchestrator treats all providers
//! uniformly through this contract regardless of implementation.

pub mod proc;

use serde::{Deserialize, Serialize};
use std::future::Future;

pub use proc::ProcProvider;

/// Aggregate CPU usage for the host.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CpuMetrics {
    /// Busy time as a percentage of total time since the previous sample.
    pub usage_percent: f64,
    pub core_count: usize,
}

/// Memory and swap usage from /proc/meminfo.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MemoryMetrics {
    pub total_bytes: u64,
    pub available_bytes: u64,
    pub used_bytes: u64,
    pub used_percent: f64,
    pub swap_total_bytes: u64,
    pub swap_free_bytes: u64,
}

/// Usage for a single mounted filesystem.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FilesystemUsage {
    pub mount_point: String,
    pub fstype: String,
    pub size_bytes: u64,
    pub available_bytes: u64,
    pub used_percent: f64,
}

/// Disk usage across real (non-pseudo) filesystems.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiskMetrics {
    pub filesystems: Vec<FilesystemUsage>,
}

/// One process in the top-N listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProcessSample {
    pub pid: u32,
    pub name: String,
    pub rss_kb: u64,
}

/// Process census: total count plus the largest residents.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProcessMetrics {
    pub total: usize,
    pub top: Vec<ProcessSample>,
}

/// Counters for a single network interface.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InterfaceStats {
    pub name: String,
    pub receive_bytes: u64,
    pub transmit_bytes: u64,
    pub receive_errors: u64,
    pub transmit_errors: u64,
}

/// Network counters across all interfaces.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NetworkMetrics {
    pub interfaces: Vec<InterfaceStats>,
}

/// System load averages for 1, 5, and 15 minute intervals.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct LoadAverage {
    pub one_min: f64,
    pub five_min: f64,
    pub fifteen_min: f64,
}

/// Static-ish host inventory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SystemInfo {
    pub hostname: String,
    pub kernel: String,
    pub uptime_seconds: u64,
    pub load_average: LoadAverage,
}

/// Capability interface for metric sources.
///
/// Each method returns `Ok(Some(value))` on success, `Ok(None)` when the
/// provider legitimately has nothing to report yet, or `Err` with a
/// diagnostic message. Implementations must be cheap to call concurrently;
/// the orchestrator runs all six methods in parallel every cycle.
pub trait MetricsProvider: Send + Sync + 'static {
    fn cpu_usage(&self) -> impl Future<Output = Result<Option<CpuMetrics>, String>> + Send;
    fn memory_usage(&self) -> impl Future<Output = Result<Option<MemoryMetrics>, String>> + Send;
    fn disk_usage(&self) -> impl Future<Output = Result<Option<DiskMetrics>, String>> + Send;
    fn processes(&self) -> impl Future<Output = Result<Option<ProcessMetrics>, String>> + Send;
    fn network_stats(&self) -> impl Future<Output = Result<Option<NetworkMetrics>, String>> + Send;
    fn system_info(&self) -> impl Future<Output = Result<Option<SystemInfo>, String>> + Send;
}
