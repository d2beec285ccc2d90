//! Per-test-type aggregation across iterations

use super::BenchmarkResult;
use crate::config::TestType;

/// Summary of all measured runs of one test type
#[derive(Debug, Clone, PartialEq)]
pub struct TestTypeSummary {
    pub test_type: TestType,
    pub runs: usize,
    pub mean_throughput_mbps: f64,
    pub min_throughput_mbps: f64,
    pub max_throughput_mbps: f64,
    /// Sample standard deviation; 0 for a single run
    pub stddev_throughput_mbps: f64,
    pub mean_latency_ms: f64,
    pub mean_iops: f64,
    pub total_bytes: u64,
}

impl TestTypeSummary {
    /// Coefficient of variation of throughput, in percent
    pub fn throughput_cv_percent(&self) -> f64 {
        if self.mean_throughput_mbps > 0.0 {
            self.stddev_throughput_mbps / self.mean_throughput_mbps * 100.0
        } else {
            0.0
        }
    }
}

/// Group results by test type, in order of first appearance
pub fn summarize(results: &[BenchmarkResult]) -> Vec<TestTypeSummary> {
    let mut order: Vec<TestType> = Vec::new();
    for r in results {
        if !order.contains(&r.test_type) {
            order.push(r.test_type);
        }
    }

    order
        .into_iter()
        .map(|test_type| {
            let group: Vec<&BenchmarkResult> =
                results.iter().filter(|r| r.test_type == test_type).collect();
            summarize_group(test_type, &group)
        })
        .collect()
}

fn summarize_group(test_type: TestType, group: &[&BenchmarkResult]) -> TestTypeSummary {
    let n = group.len() as f64;
    let mean_throughput = mean_of(group, |r| r.throughput_mbps);
    let variance = if group.len() > 1 {
        group
            .iter()
            .map(|r| (r.throughput_mbps - mean_throughput).powi(2))
            .sum::<f64>()
            / (n - 1.0)
    } else {
        0.0
    };

    TestTypeSummary {
        test_type,
        runs: group.len(),
        mean_throughput_mbps: mean_throughput,
        min_throughput_mbps: group.iter().map(|r| r.throughput_mbps).fold(f64::INFINITY, f64::min),
        max_throughput_mbps: group.iter().map(|r| r.throughput_mbps).fold(f64::NEG_INFINITY, f64::max),
        stddev_throughput_mbps: variance.sqrt(),
        mean_latency_ms: mean_of(group, |r| r.avg_latency_ms),
        mean_iops: mean_of(group, |r| r.iops),
        total_bytes: group.iter().map(|r| r.bytes_processed).sum(),
    }
}

fn mean_of(group: &[&BenchmarkResult], f: impl Fn(&BenchmarkResult) -> f64) -> f64 {
    group.iter().map(|r| f(r)).sum::<f64>() / group.len() as f64
}
