//! Snapshot assembly: history tracking and the global health verdict.
//!
//! The service wraps the orchestrator, records one history sample per cycle
//! and derives a single system-wide status from the four primary metrics.
//! Network and system inventory are informational only and never influence
//! the verdict.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::collector::{MetricResult, MetricStatus, MetricsReport, Orchestrator};
use crate::history::{HistoryBuffer, HistorySample};
use crate::providers::{
    CpuMetrics, DiskMetrics, MemoryMetrics, MetricsProvider, NetworkMetrics, ProcessMetrics,
    SystemInfo,
};

/// System-wide health verdict derived from the primary metric statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SystemStatus {
    Ok,
    Degraded,
    Critical,
}

/// One fully aggregated, timestamped view of all metrics plus history.
///
/// The unit broadcast to subscribers and returned by the point-in-time
/// query endpoint. Exists only on the wire and in producer memory for the
/// duration of one cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// Unix timestamp in milliseconds.
    pub timestamp: i64,
    pub status: SystemStatus,
    pub cpu: MetricResult<CpuMetrics>,
    pub memory: MetricResult<MemoryMetrics>,
    pub disk: MetricResult<DiskMetrics>,
    pub processes: MetricResult<ProcessMetrics>,
    pub network: MetricResult<NetworkMetrics>,
    pub system_info: MetricResult<SystemInfo>,
    pub history: Vec<HistorySample>,
}

/// Derives the global status from the four primary metrics.
///
/// All four OK yields OK. All four strictly Unavailable yields CRITICAL —
/// even one OK or Degraded among them downgrades to DEGRADED, with no
/// partial-critical tier in between.
fn global_status(report: &MetricsReport) -> SystemStatus {
    let primary = [
        report.cpu.status,
        report.memory.status,
        report.disk.status,
        report.processes.status,
    ];

    if primary.iter().all(|s| *s == MetricStatus::Ok) {
        SystemStatus::Ok
    } else if primary.iter().all(|s| *s == MetricStatus::Unavailable) {
        SystemStatus::Critical
    } else {
        SystemStatus::Degraded
    }
}

/// Produces snapshots: one orchestrator cycle plus history and verdict.
///
/// Owns the history buffer exclusively. Concurrent `current_snapshot` calls
/// on one service are not supported; callers serialize access (the app
/// state holds the service behind a mutex).
pub struct SnapshotService<P> {
    orchestrator: Orchestrator<P>,
    history: HistoryBuffer,
}

impl<P: MetricsProvider> SnapshotService<P> {
    pub fn new(orchestrator: Orchestrator<P>) -> Self {
        Self {
            orchestrator,
            history: HistoryBuffer::new(),
        }
    }

    /// Runs one collection cycle and assembles the snapshot.
    pub async fn current_snapshot(&mut self) -> Snapshot {
        let report = self.orchestrator.collect().await;
        let timestamp = chrono::Utc::now().timestamp_millis();

        // Chart only fresh values: fallback data from a degraded or
        // unavailable cycle would plot as a stale flat line.
        let cpu_point = fresh(&report.cpu).map(|c| c.usage_percent);
        let memory_point = fresh(&report.memory).map(|m| m.used_percent);

        self.history.push(HistorySample {
            cpu: cpu_point,
            memory: memory_point,
            timestamp,
        });

        let status = global_status(&report);
        debug!(?status, samples = self.history.len(), "cycle complete");

        Snapshot {
            timestamp,
            status,
            cpu: report.cpu,
            memory: report.memory,
            disk: report.disk,
            processes: report.processes,
            network: report.network,
            system_info: report.system_info,
            history: self.history.samples(),
        }
    }
}

/// Returns the data only when it was freshly collected this cycle.
fn fresh<T>(result: &MetricResult<T>) -> Option<&T> {
    if result.is_ok() {
        result.data.as_ref()
    } else {
        None
    }
}
