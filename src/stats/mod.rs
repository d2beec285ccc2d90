//! Run results and metric derivation
//!
//! A [`BenchmarkResult`] is produced once per measured run and never modified
//! afterwards. The three derived metrics come from wall-clock timing only:
//!
//! - throughput (MB/s) = nominal file size in MiB / elapsed seconds
//! - average latency (ms) = elapsed whole milliseconds / operation count
//! - IOPS = operation count / elapsed seconds
//!
//! A run that completes in under one millisecond, or performs no operations,
//! has no meaningful metrics; [`RunMetrics::compute`] returns `None` for it.

pub mod aggregator;

use crate::config::{TestType, MIB};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Outcome of one measured run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BenchmarkResult {
    pub run_id: u32,
    pub test_type: TestType,
    pub bytes_processed: u64,
    pub elapsed: Duration,
    pub throughput_mbps: f64,
    pub avg_latency_ms: f64,
    pub iops: f64,
    /// Completion time of the run
    pub timestamp: DateTime<Utc>,
}

impl BenchmarkResult {
    pub fn elapsed_ms(&self) -> u128 {
        self.elapsed.as_millis()
    }
}

/// Throughput, latency and IOPS for one timed pass
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunMetrics {
    pub throughput_mbps: f64,
    pub avg_latency_ms: f64,
    pub iops: f64,
}

impl RunMetrics {
    /// Derive metrics, or `None` when elapsed rounds to 0 ms or `ops` is 0
    pub fn compute(file_size_bytes: u64, ops: u64, elapsed: Duration) -> Option<Self> {
        let elapsed_ms = elapsed.as_millis();
        if elapsed_ms == 0 || ops == 0 {
            return None;
        }

        let seconds = elapsed.as_secs_f64();
        Some(Self {
            throughput_mbps: (file_size_bytes as f64 / MIB as f64) / seconds,
            avg_latency_ms: elapsed_ms as f64 / ops as f64,
            iops: ops as f64 / seconds,
        })
    }
}
