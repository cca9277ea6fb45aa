//! Collector orchestration: bounded, fault-isolated metric collection.
//!
//! The orchestrator runs all six collectors concurrently each cycle, applies
//! the timeout guard to every call, classifies each outcome and falls back
//! to the last successfully observed value when a cycle fails. Failures are
//! strictly local: one collector's fault never changes another's result, and
//! `collect` itself never fails.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::CollectError;
use crate::providers::{
    CpuMetrics, DiskMetrics, MemoryMetrics, MetricsProvider, NetworkMetrics, ProcessMetrics,
    SystemInfo,
};
use crate::timeout::{with_timeout, DEFAULT_DEADLINE};

/// Per-metric collection status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricStatus {
    /// Fresh value collected this cycle.
    Ok,
    /// The collector timed out; data is the last known good value.
    Degraded,
    /// The collector failed or had nothing; data is the last known good value.
    Unavailable,
}

/// The fixed set of metric kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKey {
    Cpu,
    Memory,
    Disk,
    Processes,
    Network,
    SystemInfo,
}

impl MetricKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKey::Cpu => "cpu",
            MetricKey::Memory => "memory",
            MetricKey::Disk => "disk",
            MetricKey::Processes => "processes",
            MetricKey::Network => "network",
            MetricKey::SystemInfo => "systemInfo",
        }
    }
}

/// Result of one collector for one cycle.
///
/// Invariant: `status == Ok` implies `data.is_some()`. When the status is
/// not Ok, `data` holds the most recent value that arrived with status Ok
/// for this metric kind, or `None` if none ever has.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricResult<T> {
    pub status: MetricStatus,
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> MetricResult<T> {
    pub fn is_ok(&self) -> bool {
        self.status == MetricStatus::Ok
    }
}

/// Last value observed with status Ok, per metric kind.
///
/// Mutated only by the orchestrator; lives for the process lifetime and is
/// never cleared.
#[derive(Default)]
struct LastKnownStore {
    cpu: Option<CpuMetrics>,
    memory: Option<MemoryMetrics>,
    disk: Option<DiskMetrics>,
    processes: Option<ProcessMetrics>,
    network: Option<NetworkMetrics>,
    system_info: Option<SystemInfo>,
}

/// All six per-metric results for one collection cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsReport {
    pub cpu: MetricResult<CpuMetrics>,
    pub memory: MetricResult<MemoryMetrics>,
    pub disk: MetricResult<DiskMetrics>,
    pub processes: MetricResult<ProcessMetrics>,
    pub network: MetricResult<NetworkMetrics>,
    pub system_info: MetricResult<SystemInfo>,
}

/// Runs the six collectors concurrently and classifies their outcomes.
pub struct Orchestrator<P> {
    provider: Arc<P>,
    last_known: LastKnownStore,
    deadline: Duration,
}

impl<P: MetricsProvider> Orchestrator<P> {
    pub fn new(provider: P) -> Self {
        Self::with_deadline(provider, DEFAULT_DEADLINE)
    }

    pub fn with_deadline(provider: P, deadline: Duration) -> Self {
        Self {
            provider: Arc::new(provider),
            last_known: LastKnownStore::default(),
            deadline,
        }
    }

    /// Collects all six metrics for one cycle. Never fails; every provider
    /// fault is converted into a per-metric status with fallback data. The
    /// call returns only after every collector has produced a result or
    /// been timed out.
    pub async fn collect(&mut self) -> MetricsReport {
        let d = self.deadline;

        let cpu = {
            let p = Arc::clone(&self.provider);
            with_timeout(d, async move { p.cpu_usage().await })
        };
        let memory = {
            let p = Arc::clone(&self.provider);
            with_timeout(d, async move { p.memory_usage().await })
        };
        let disk = {
            let p = Arc::clone(&self.provider);
            with_timeout(d, async move { p.disk_usage().await })
        };
        let processes = {
            let p = Arc::clone(&self.provider);
            with_timeout(d, async move { p.processes().await })
        };
        let network = {
            let p = Arc::clone(&self.provider);
            with_timeout(d, async move { p.network_stats().await })
        };
        let system_info = {
            let p = Arc::clone(&self.provider);
            with_timeout(d, async move { p.system_info().await })
        };

        // All six guarded calls in flight at once; a hung collector costs
        // one deadline for the whole cycle, not one per collector.
        let (cpu, memory, disk, processes, network, system_info) =
            tokio::join!(cpu, memory, disk, processes, network, system_info);

        MetricsReport {
            cpu: classify(MetricKey::Cpu, cpu, &mut self.last_known.cpu),
            memory: classify(MetricKey::Memory, memory, &mut self.last_known.memory),
            disk: classify(MetricKey::Disk, disk, &mut self.last_known.disk),
            processes: classify(
                MetricKey::Processes,
                processes,
                &mut self.last_known.processes,
            ),
            network: classify(MetricKey::Network, network, &mut self.last_known.network),
            system_info: classify(
                MetricKey::SystemInfo,
                system_info,
                &mut self.last_known.system_info,
            ),
        }
    }
}

/// Converts one guarded collector outcome into a `MetricResult`, updating
/// the last-known-good slot on success.
fn classify<T: Clone>(
    key: MetricKey,
    outcome: Result<Option<T>, CollectError>,
    last_known: &mut Option<T>,
) -> MetricResult<T> {
    match outcome {
        Ok(Some(value)) => {
            *last_known = Some(value.clone());
            MetricResult {
                status: MetricStatus::Ok,
                data: Some(value),
                error: None,
            }
        }
        Ok(None) => {
            debug!(metric = key.as_str(), "collector returned no data");
            MetricResult {
                status: MetricStatus::Unavailable,
                data: last_known.clone(),
                error: Some(format!("{} returned null", key.as_str())),
            }
        }
        Err(err) => {
            let status = if err.is_timeout() {
                MetricStatus::Degraded
            } else {
                MetricStatus::Unavailable
            };
            debug!(metric = key.as_str(), error = %err, "collector failed");
            MetricResult {
                status,
                data: last_known.clone(),
                error: Some(err.to_string()),
            }
        }
    }
}
