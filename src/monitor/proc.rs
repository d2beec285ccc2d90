//! Linux /proc based metrics
//!
//! - CPU: busy share of all CPU time between two samples (`/proc/stat`)
//! - RAM: `(MemTotal - MemAvailable) / MemTotal` from `/proc/meminfo`
//! - Disk: busiest device's `io_ticks` delta over wall time (`/proc/diskstats`)
//! - Temperature: first `nvme` / `drivetemp` hwmon sensor, when present
//!
//! The first sample has no previous counters, so CPU is reported since boot
//! and disk utilization as 0. Unreadable files yield 0 (or no temperature)
//! instead of failing; sampling must never disturb a benchmark.

use super::{MetricsSnapshot, MetricsSource};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::time::Instant;

/// Aggregate CPU counters in clock ticks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CpuTimes {
    pub busy: u64,
    pub total: u64,
}

pub struct ProcMetricsSource {
    proc_root: PathBuf,
    hwmon_root: PathBuf,
    last_cpu: Option<CpuTimes>,
    last_disk: Option<(Instant, HashMap<String, u64>)>,
}

impl ProcMetricsSource {
    pub fn new() -> Self {
        Self::with_roots("/proc", "/sys/class/hwmon")
    }

    /// Read from alternative roots (used by tests)
    pub fn with_roots(proc_root: impl Into<PathBuf>, hwmon_root: impl Into<PathBuf>) -> Self {
        Self {
            proc_root: proc_root.into(),
            hwmon_root: hwmon_root.into(),
            last_cpu: None,
            last_disk: None,
        }
    }

    fn read(&self, name: &str) -> Option<String> {
        fs::read_to_string(self.proc_root.join(name)).ok()
    }

    fn cpu_percent(&mut self) -> f64 {
        let Some(now) = self.read("stat").as_deref().and_then(parse_cpu_times) else {
            return 0.0;
        };
        let since = self.last_cpu.replace(now).unwrap_or_default();

        let total = now.total.saturating_sub(since.total);
        if total == 0 {
            return 0.0;
        }
        now.busy.saturating_sub(since.busy) as f64 / total as f64 * 100.0
    }

    fn ram_percent(&self) -> f64 {
        self.read("meminfo").as_deref().and_then(parse_mem_used_percent).unwrap_or(0.0)
    }

    fn disk_percent(&mut self) -> f64 {
        let Some(ticks) = self.read("diskstats").as_deref().map(parse_io_ticks) else {
            return 0.0;
        };
        let now = Instant::now();

        let percent = match &self.last_disk {
            Some((then, previous)) => {
                let wall_ms = now.duration_since(*then).as_millis() as f64;
                if wall_ms <= 0.0 {
                    0.0
                } else {
                    ticks
                        .iter()
                        .filter_map(|(dev, &t)| previous.get(dev).map(|&p| t.saturating_sub(p)))
                        .max()
                        .map(|busy_ms| busy_ms as f64 / wall_ms * 100.0)
                        .unwrap_or(0.0)
                }
            }
            None => 0.0,
        };

        self.last_disk = Some((now, ticks));
        percent
    }

    fn disk_temperature(&self) -> Option<f64> {
        let entries = fs::read_dir(&self.hwmon_root).ok()?;
        for entry in entries.flatten() {
            let dir = entry.path();
            let name = fs::read_to_string(dir.join("name")).unwrap_or_default();
            if !matches!(name.trim(), "nvme" | "drivetemp") {
                continue;
            }
            if let Some(millis) = fs::read_to_string(dir.join("temp1_input"))
                .ok()
                .and_then(|s| s.trim().parse::<i64>().ok())
            {
                return Some(millis as f64 / 1000.0);
            }
        }
        None
    }
}

impl Default for ProcMetricsSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsSource for ProcMetricsSource {
    fn sample(&mut self) -> MetricsSnapshot {
        let cpu = self.cpu_percent();
        let ram = self.ram_percent();
        let disk = self.disk_percent();
        MetricsSnapshot::now(cpu, ram, disk, self.disk_temperature())
    }

    fn name(&self) -> &'static str {
        "proc"
    }
}

/// Parse the aggregate `cpu` line of /proc/stat
///
/// Idle time is `idle + iowait`; busy is everything else except guest time,
/// which is already included in user/nice.
pub fn parse_cpu_times(stat: &str) -> Option<CpuTimes> {
    let line = stat.lines().find(|l| l.starts_with("cpu "))?;
    let fields: Vec<u64> = line
        .split_whitespace()
        .skip(1)
        .take(8)
        .map(|f| f.parse().ok())
        .collect::<Option<Vec<u64>>>()?;
    if fields.len() < 4 {
        return None;
    }

    let total: u64 = fields.iter().sum();
    let idle = fields[3] + fields.get(4).copied().unwrap_or(0);
    Some(CpuTimes {
        busy: total - idle,
        total,
    })
}

/// Percentage of memory in use according to /proc/meminfo
pub fn parse_mem_used_percent(meminfo: &str) -> Option<f64> {
    let field = |key: &str| -> Option<u64> {
        meminfo
            .lines()
            .find(|l| l.starts_with(key))?
            .split_whitespace()
            .nth(1)?
            .parse()
            .ok()
    };

    let total = field("MemTotal:")?;
    let available = field("MemAvailable:")?;
    if total == 0 {
        return None;
    }
    Some(total.saturating_sub(available) as f64 / total as f64 * 100.0)
}

/// `io_ticks` (milliseconds spent doing I/O) per device from /proc/diskstats
///
/// Loop and ram devices are skipped.
pub fn parse_io_ticks(diskstats: &str) -> HashMap<String, u64> {
    diskstats
        .lines()
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 13 {
                return None;
            }
            let name = fields[2];
            if name.starts_with("loop") || name.starts_with("ram") {
                return None;
            }
            let ticks = fields[12].parse().ok()?;
            Some((name.to_string(), ticks))
        })
        .collect()
}
