//! Integration tests for the collection pipeline.
//!
//! These tests drive a scripted provider through the full
//! orchestrator-to-snapshot path and verify status classification,
//! last-known-good fallback and history accumulation across cycles.

use std::sync::{Arc, Mutex};

use hostpulse::collector::{MetricStatus, Orchestrator};
use hostpulse::providers::{
    CpuMetrics, DiskMetrics, LoadAverage, MemoryMetrics, MetricsProvider, NetworkMetrics,
    ProcessMetrics, SystemInfo,
};
use hostpulse::snapshot::{SnapshotService, SystemStatus};
use hostpulse::HISTORY_CAPACITY;

/// How one scripted collector behaves on the next cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Behavior {
    Value(u64),
    Empty,
    Fail,
}

/// Per-collector behaviors for the next cycle.
#[derive(Debug, Clone, Copy)]
struct Script {
    cpu: Behavior,
    memory: Behavior,
    disk: Behavior,
    processes: Behavior,
    network: Behavior,
    system_info: Behavior,
}

impl Script {
    fn healthy(v: u64) -> Self {
        Self {
            cpu: Behavior::Value(v),
            memory: Behavior::Value(v),
            disk: Behavior::Value(v),
            processes: Behavior::Value(v),
            network: Behavior::Value(v),
            system_info: Behavior::Value(v),
        }
    }

    fn all(behavior: Behavior) -> Self {
        Self {
            cpu: behavior,
            memory: behavior,
            disk: behavior,
            processes: behavior,
            network: behavior,
            system_info: behavior,
        }
    }
}

/// Provider whose behavior can be rescripted between cycles from outside
/// the service that owns it.
struct ScriptedProvider {
    script: Arc<Mutex<Script>>,
}

fn scripted(initial: Script) -> (ScriptedProvider, Arc<Mutex<Script>>) {
    let script = Arc::new(Mutex::new(initial));
    (
        ScriptedProvider {
            script: script.clone(),
        },
        script,
    )
}

fn run<T>(behavior: Behavior, make: impl Fn(u64) -> T) -> Result<Option<T>, String> {
    match behavior {
        Behavior::Value(v) => Ok(Some(make(v))),
        Behavior::Empty => Ok(None),
        Behavior::Fail => Err("scripted failure".to_string()),
    }
}

impl ScriptedProvider {
    fn current(&self) -> Script {
        *self.script.lock().unwrap()
    }
}

impl MetricsProvider for ScriptedProvider {
    async fn cpu_usage(&self) -> Result<Option<CpuMetrics>, String> {
        run(self.current().cpu, |v| CpuMetrics {
            usage_percent: v as f64,
            core_count: 8,
        })
    }

    async fn memory_usage(&self) -> Result<Option<MemoryMetrics>, String> {
        run(self.current().memory, |v| MemoryMetrics {
            total_bytes: 1000,
            available_bytes: 1000 - v,
            used_bytes: v,
            used_percent: v as f64 / 10.0,
            swap_total_bytes: 0,
            swap_free_bytes: 0,
        })
    }

    async fn disk_usage(&self) -> Result<Option<DiskMetrics>, String> {
        run(self.current().disk, |_| DiskMetrics {
            filesystems: Vec::new(),
        })
    }

    async fn processes(&self) -> Result<Option<ProcessMetrics>, String> {
        run(self.current().processes, |v| ProcessMetrics {
            total: v as usize,
            top: Vec::new(),
        })
    }

    async fn network_stats(&self) -> Result<Option<NetworkMetrics>, String> {
        run(self.current().network, |_| NetworkMetrics {
            interfaces: Vec::new(),
        })
    }

    async fn system_info(&self) -> Result<Option<SystemInfo>, String> {
        run(self.current().system_info, |_| SystemInfo {
            hostname: "pipeline-test".to_string(),
            kernel: "6.0".to_string(),
            uptime_seconds: 42,
            load_average: LoadAverage {
                one_min: 0.1,
                five_min: 0.2,
                fifteen_min: 0.3,
            },
        })
    }
}

fn service_with(initial: Script) -> (SnapshotService<ScriptedProvider>, Arc<Mutex<Script>>) {
    let (provider, script) = scripted(initial);
    (
        SnapshotService::new(Orchestrator::new(provider)),
        script,
    )
}

#[tokio::test]
async fn test_healthy_cycles_accumulate_history() {
    let (mut service, _script) = service_with(Script::healthy(10));

    for cycle in 1..=5 {
        let snapshot = service.current_snapshot().await;
        assert_eq!(snapshot.status, SystemStatus::Ok);
        assert_eq!(snapshot.history.len(), cycle);
    }

    let snapshot = service.current_snapshot().await;
    let newest = snapshot.history.last().unwrap();
    assert_eq!(newest.cpu, Some(10.0));
    assert_eq!(newest.memory, Some(1.0));
}

#[tokio::test]
async fn test_history_stays_within_the_window() {
    let (mut service, _script) = service_with(Script::healthy(10));

    let mut last_len = 0;
    for _ in 0..(HISTORY_CAPACITY + 5) {
        let snapshot = service.current_snapshot().await;
        last_len = snapshot.history.len();
    }
    assert_eq!(last_len, HISTORY_CAPACITY);
}

#[tokio::test]
async fn test_total_failure_is_critical_with_null_data() {
    let (mut service, _script) = service_with(Script::all(Behavior::Fail));

    let snapshot = service.current_snapshot().await;
    assert_eq!(snapshot.status, SystemStatus::Critical);
    assert_eq!(snapshot.cpu.status, MetricStatus::Unavailable);
    assert!(snapshot.cpu.data.is_none(), "no history to fall back to");
    assert_eq!(snapshot.cpu.error.as_deref(), Some("scripted failure"));

    // The failed cycle still records a history slot, with empty points.
    assert_eq!(snapshot.history.len(), 1);
    assert_eq!(snapshot.history[0].cpu, None);
    assert_eq!(snapshot.history[0].memory, None);
}

#[tokio::test]
async fn test_partial_failure_degrades_and_falls_back() {
    let (mut service, script) = service_with(Script::healthy(25));

    let first = service.current_snapshot().await;
    assert_eq!(first.status, SystemStatus::Ok);

    script.lock().unwrap().cpu = Behavior::Fail;
    script.lock().unwrap().memory = Behavior::Empty;

    let second = service.current_snapshot().await;
    assert_eq!(second.status, SystemStatus::Degraded);

    // Fallback carries the value observed on the healthy first cycle.
    assert_eq!(second.cpu.status, MetricStatus::Unavailable);
    assert_eq!(second.cpu.data.as_ref().unwrap().usage_percent, 25.0);
    assert_eq!(second.memory.status, MetricStatus::Unavailable);
    assert_eq!(second.memory.data.as_ref().unwrap().used_bytes, 25);

    // Fallback data never becomes a chart point.
    let newest = second.history.last().unwrap();
    assert_eq!(newest.cpu, None);
    assert_eq!(newest.memory, None);
}

#[tokio::test]
async fn test_recovery_returns_to_ok_with_fresh_points() {
    let (mut service, script) = service_with(Script::healthy(10));
    service.current_snapshot().await;

    *script.lock().unwrap() = Script::all(Behavior::Fail);
    let failed = service.current_snapshot().await;
    assert_eq!(failed.status, SystemStatus::Critical);

    *script.lock().unwrap() = Script::healthy(30);
    let recovered = service.current_snapshot().await;
    assert_eq!(recovered.status, SystemStatus::Ok);
    assert_eq!(recovered.cpu.data.as_ref().unwrap().usage_percent, 30.0);

    // Three cycles, the failed one leaving a gap in the chart.
    let points: Vec<Option<f64>> = recovered.history.iter().map(|s| s.cpu).collect();
    assert_eq!(points, vec![Some(10.0), None, Some(30.0)]);
}

#[tokio::test]
async fn test_snapshot_serializes_with_wire_field_names() {
    let (mut service, script) = service_with(Script::healthy(10));
    script.lock().unwrap().network = Behavior::Fail;

    let snapshot = service.current_snapshot().await;
    let json = serde_json::to_string(&snapshot).unwrap();

    assert!(json.contains("\"status\":\"ok\""), "informational failure never degrades: {json}");
    assert!(json.contains("\"usage_percent\""));
    assert!(json.contains("\"history\""));
    // Errors appear only on failed metrics.
    assert!(json.contains("scripted failure"));
}
