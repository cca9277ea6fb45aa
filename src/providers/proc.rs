//! Linux /proc filesystem provider.
//!
//! Reads all six metric kinds straight from procfs. CPU usage is computed
//! from the delta between two /proc/stat samples, so the very first call has
//! no baseline and legitimately reports nothing (`Ok(None)`).

use std::fs;
use std::sync::RwLock;

use super::{
    CpuMetrics, DiskMetrics, FilesystemUsage, InterfaceStats, LoadAverage, MemoryMetrics,
    MetricsProvider, NetworkMetrics, ProcessMetrics, ProcessSample, SystemInfo,
};

/// Number of processes reported in the top-by-RSS listing.
const TOP_PROCESSES: usize = 10;

/// Aggregate CPU time counters from the first line of /proc/stat.
#[derive(Debug, Clone, Copy)]
struct CpuTimes {
    user: u64,
    nice: u64,
    system: u64,
    idle: u64,
    iowait: u64,
    irq: u64,
    softirq: u64,
    steal: u64,
}

impl CpuTimes {
    fn total(&self) -> u64 {
        self.user
            + self.nice
            + self.system
            + self.idle
            + self.iowait
            + self.irq
            + self.softirq
            + self.steal
    }

    /// Non-active time (idle + iowait).
    fn idle_total(&self) -> u64 {
        self.idle + self.iowait
    }
}

/// Metric provider backed by the Linux /proc filesystem.
pub struct ProcProvider {
    prev_cpu: RwLock<Option<CpuTimes>>,
}

impl ProcProvider {
    pub fn new() -> Self {
        Self {
            prev_cpu: RwLock::new(None),
        }
    }
}

impl Default for ProcProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsProvider for ProcProvider {
    async fn cpu_usage(&self) -> Result<Option<CpuMetrics>, String> {
        let (current, core_count) = read_cpu_times()?;

        let previous = {
            let mut guard = self
                .prev_cpu
                .write()
                .map_err(|e| format!("Failed to acquire CPU cache lock: {}", e))?;
            guard.replace(current)
        };

        let Some(previous) = previous else {
            // No baseline yet; the next sample will have a delta.
            return Ok(None);
        };

        let delta_total = current.total().saturating_sub(previous.total());
        if delta_total == 0 {
            return Ok(None);
        }

        let delta_non_active = current.idle_total().saturating_sub(previous.idle_total());
        let usage_ratio = (delta_total - delta_non_active) as f64 / delta_total as f64;

        Ok(Some(CpuMetrics {
            usage_percent: usage_ratio * 100.0,
            core_count,
        }))
    }

    async fn memory_usage(&self) -> Result<Option<MemoryMetrics>, String> {
        read_memory_info().map(Some)
    }

    async fn disk_usage(&self) -> Result<Option<DiskMetrics>, String> {
        let filesystems = read_filesystem_usage()?;
        if filesystems.is_empty() {
            return Ok(None);
        }
        Ok(Some(DiskMetrics { filesystems }))
    }

    async fn processes(&self) -> Result<Option<ProcessMetrics>, String> {
        read_process_census().map(Some)
    }

    async fn network_stats(&self) -> Result<Option<NetworkMetrics>, String> {
        let interfaces = read_netdev_stats()?;
        if interfaces.is_empty() {
            return Ok(None);
        }
        Ok(Some(NetworkMetrics { interfaces }))
    }

    async fn system_info(&self) -> Result<Option<SystemInfo>, String> {
        read_system_info().map(Some)
    }
}

/// Reads aggregate CPU times and the core count from /proc/stat.
fn read_cpu_times() -> Result<(CpuTimes, usize), String> {
    let content = fs::read_to_string("/proc/stat")
        .map_err(|e| format!("Failed to read /proc/stat: {}", e))?;

    let mut aggregate: Option<CpuTimes> = None;
    let mut core_count = 0usize;

    for line in content.lines() {
        if !line.starts_with("cpu") {
            continue;
        }
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 8 {
            continue;
        }

        if parts[0] == "cpu" {
            aggregate = Some(CpuTimes {
                user: parts[1].parse().unwrap_or(0),
                nice: parts[2].parse().unwrap_or(0),
                system: parts[3].parse().unwrap_or(0),
                idle: parts[4].parse().unwrap_or(0),
                iowait: parts[5].parse().unwrap_or(0),
                irq: parts[6].parse().unwrap_or(0),
                softirq: parts[7].parse().unwrap_or(0),
                steal: if parts.len() > 8 {
                    parts[8].parse().unwrap_or(0)
                } else {
                    0
                },
            });
        } else {
            // "cpu0", "cpu1", ... one line per core
            core_count += 1;
        }
    }

    match aggregate {
        Some(times) => Ok((times, core_count)),
        None => Err("No aggregate CPU line found in /proc/stat".to_string()),
    }
}

/// Reads memory and swap usage from /proc/meminfo.
fn read_memory_info() -> Result<MemoryMetrics, String> {
    let content = fs::read_to_string("/proc/meminfo")
        .map_err(|e| format!("Failed to read /proc/meminfo: {}", e))?;

    let mut total_kb: Option<u64> = None;
    let mut available_kb: Option<u64> = None;
    let mut swap_total_kb: Option<u64> = None;
    let mut swap_free_kb: Option<u64> = None;

    for line in content.lines() {
        let mut parse_into = |target: &mut Option<u64>| {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() >= 2 {
                if let Ok(kb) = parts[1].parse::<u64>() {
                    *target = Some(kb);
                }
            }
        };

        if line.starts_with("MemTotal:") {
            parse_into(&mut total_kb);
        } else if line.starts_with("MemAvailable:") {
            parse_into(&mut available_kb);
        } else if line.starts_with("SwapTotal:") {
            parse_into(&mut swap_total_kb);
        } else if line.starts_with("SwapFree:") {
            parse_into(&mut swap_free_kb);
        }

        if total_kb.is_some()
            && available_kb.is_some()
            && swap_total_kb.is_some()
            && swap_free_kb.is_some()
        {
            break;
        }
    }

    match (total_kb, available_kb, swap_total_kb, swap_free_kb) {
        (Some(total), Some(available), Some(swap_total), Some(swap_free)) => {
            let total_bytes = total * 1024;
            let available_bytes = available * 1024;
            let used_bytes = total_bytes.saturating_sub(available_bytes);
            let used_percent = if total_bytes > 0 {
                used_bytes as f64 / total_bytes as f64 * 100.0
            } else {
                0.0
            };
            Ok(MemoryMetrics {
                total_bytes,
                available_bytes,
                used_bytes,
                used_percent,
                swap_total_bytes: swap_total * 1024,
                swap_free_bytes: swap_free * 1024,
            })
        }
        _ => Err("Failed to parse required fields from /proc/meminfo".to_string()),
    }
}

/// Reads usage for every real mounted filesystem via /proc/mounts + statvfs.
fn read_filesystem_usage() -> Result<Vec<FilesystemUsage>, String> {
    let mounts_content = fs::read_to_string("/proc/mounts")
        .map_err(|e| format!("Failed to read /proc/mounts: {}", e))?;

    let mut filesystems = Vec::new();

    for line in mounts_content.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 3 {
            continue;
        }

        let mount_point = parts[1].to_string();
        let fstype = parts[2].to_string();

        if should_skip_filesystem(&fstype, &mount_point) {
            continue;
        }

        match statvfs_usage(&mount_point) {
            Ok((size_bytes, available_bytes, used_percent)) => {
                filesystems.push(FilesystemUsage {
                    mount_point,
                    fstype,
                    size_bytes,
                    available_bytes,
                    used_percent,
                });
            }
            Err(_) => continue, // Skip filesystems we can't stat
        }
    }

    Ok(filesystems)
}

/// Checks if a filesystem should be skipped based on type and mount point.
fn should_skip_filesystem(fstype: &str, mount_point: &str) -> bool {
    let skip_types = [
        "proc",
        "sysfs",
        "devpts",
        "devtmpfs",
        "tmpfs",
        "cgroup",
        "cgroup2",
        "pstore",
        "bpf",
        "debugfs",
        "tracefs",
        "fusectl",
        "configfs",
        "securityfs",
        "hugetlbfs",
        "mqueue",
        "autofs",
        "binfmt_misc",
        "overlay",
        "squashfs",
    ];

    if skip_types.contains(&fstype) {
        return true;
    }

    mount_point.starts_with("/proc")
        || mount_point.starts_with("/sys")
        || mount_point.starts_with("/dev")
        || mount_point.starts_with("/run")
}

/// Gets size, available bytes and used percentage via libc statvfs.
fn statvfs_usage(path: &str) -> Result<(u64, u64, f64), String> {
    use std::ffi::CString;
    use std::mem;

    let c_path = CString::new(path).map_err(|e| format!("Invalid path: {}", e))?;

    unsafe {
        let mut stat: libc::statvfs = mem::zeroed();
        if libc::statvfs(c_path.as_ptr(), &mut stat) != 0 {
            return Err(format!("statvfs failed for {}", path));
        }

        let block_size = stat.f_frsize as u64;
        let size_bytes = block_size * stat.f_blocks;
        let available_bytes = block_size * stat.f_bavail;
        let used_bytes = size_bytes.saturating_sub(block_size * stat.f_bfree);
        let used_percent = if size_bytes > 0 {
            used_bytes as f64 / size_bytes as f64 * 100.0
        } else {
            0.0
        };

        Ok((size_bytes, available_bytes, used_percent))
    }
}

/// Scans /proc for processes and returns the count plus the top residents.
fn read_process_census() -> Result<ProcessMetrics, String> {
    let entries =
        fs::read_dir("/proc").map_err(|e| format!("Failed to read /proc: {}", e))?;

    let page_kb = unsafe { libc::sysconf(libc::_SC_PAGESIZE) as u64 / 1024 };

    let mut samples: Vec<ProcessSample> = Vec::new();

    for entry in entries.flatten() {
        let name = entry.file_name();
        let Some(pid) = name.to_str().and_then(|s| s.parse::<u32>().ok()) else {
            continue;
        };

        // Processes can exit mid-scan; missing files are not an error.
        let Ok(comm) = fs::read_to_string(format!("/proc/{}/comm", pid)) else {
            continue;
        };
        let Ok(statm) = fs::read_to_string(format!("/proc/{}/statm", pid)) else {
            continue;
        };

        let resident_pages: u64 = statm
            .split_whitespace()
            .nth(1)
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);

        samples.push(ProcessSample {
            pid,
            name: comm.trim().to_string(),
            rss_kb: resident_pages * page_kb,
        });
    }

    if samples.is_empty() {
        return Err("No processes found in /proc".to_string());
    }

    let total = samples.len();
    samples.sort_by(|a, b| b.rss_kb.cmp(&a.rss_kb));
    samples.truncate(TOP_PROCESSES);

    Ok(ProcessMetrics {
        total,
        top: samples,
    })
}

/// Reads per-interface counters from /proc/net/dev.
fn read_netdev_stats() -> Result<Vec<InterfaceStats>, String> {
    let content = fs::read_to_string("/proc/net/dev")
        .map_err(|e| format!("Failed to read /proc/net/dev: {}", e))?;

    let mut interfaces = Vec::new();

    for (idx, line) in content.lines().enumerate() {
        // Skip the first two header lines
        if idx < 2 {
            continue;
        }

        let parts: Vec<&str> = line.split(':').collect();
        if parts.len() != 2 {
            continue;
        }

        let name = parts[0].trim().to_string();
        let values: Vec<&str> = parts[1].split_whitespace().collect();
        if values.len() < 16 {
            continue; // Skip malformed lines
        }

        interfaces.push(InterfaceStats {
            name,
            receive_bytes: values[0].parse().unwrap_or(0),
            receive_errors: values[2].parse().unwrap_or(0),
            transmit_bytes: values[8].parse().unwrap_or(0),
            transmit_errors: values[10].parse().unwrap_or(0),
        });
    }

    Ok(interfaces)
}

/// Reads host inventory: hostname, kernel release, uptime, load averages.
fn read_system_info() -> Result<SystemInfo, String> {
    let hostname = fs::read_to_string("/proc/sys/kernel/hostname")
        .map_err(|e| format!("Failed to read hostname: {}", e))?
        .trim()
        .to_string();

    let kernel = fs::read_to_string("/proc/sys/kernel/osrelease")
        .map_err(|e| format!("Failed to read kernel release: {}", e))?
        .trim()
        .to_string();

    let uptime_content = fs::read_to_string("/proc/uptime")
        .map_err(|e| format!("Failed to read /proc/uptime: {}", e))?;
    let uptime_seconds = uptime_content
        .split_whitespace()
        .next()
        .and_then(|v| v.parse::<f64>().ok())
        .ok_or_else(|| "Invalid /proc/uptime format".to_string())? as u64;

    let load_average = read_load_average()?;

    Ok(SystemInfo {
        hostname,
        kernel,
        uptime_seconds,
        load_average,
    })
}

/// Reads load average from /proc/loadavg.
///
/// Format: "0.00 0.01 0.05 1/234 5678"
fn read_load_average() -> Result<LoadAverage, String> {
    let content = fs::read_to_string("/proc/loadavg")
        .map_err(|e| format!("Failed to read /proc/loadavg: {}", e))?;

    let parts: Vec<&str> = content.split_whitespace().collect();
    if parts.len() < 3 {
        return Err(format!(
            "Invalid /proc/loadavg format: expected at least 3 fields, got {}",
            parts.len()
        ));
    }

    let one_min = parts[0]
        .parse::<f64>()
        .map_err(|e| format!("Failed to parse 1min load average: {}", e))?;
    let five_min = parts[1]
        .parse::<f64>()
        .map_err(|e| format!("Failed to parse 5min load average: {}", e))?;
    let fifteen_min = parts[2]
        .parse::<f64>()
        .map_err(|e| format!("Failed to parse 15min load average: {}", e))?;

    Ok(LoadAverage {
        one_min,
        five_min,
        fifteen_min,
    })
}
