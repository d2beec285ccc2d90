//! JSON output formatting
//!
//! The report is a single pretty-printed document:
//!
//! ```json
//! {
//!   "sessionId": "sm-...",
//!   "generatedAt": "2024-03-01T12:30:00Z",
//!   "host": { "hostname": "...", "cpus": 16, "os": "linux" },
//!   "results": [ { "runId": 1, "testType": "SEQ_READ", ... } ],
//!   "metrics": [ { "timestamp": "...", "cpuPercent": 12.5, ... } ]
//! }
//! ```
//!
//! [`read_json_report`] parses the same document back, so reports can be
//! compared across sessions.

use crate::error::Error;
use crate::monitor::MetricsSnapshot;
use crate::stats::BenchmarkResult;
use crate::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// Machine the session ran on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostInfo {
    pub hostname: String,
    pub cpus: usize,
    pub os: String,
}

impl HostInfo {
    pub fn current() -> Self {
        let hostname = hostname::get()
            .map(|h| h.to_string_lossy().into_owned())
            .unwrap_or_else(|_| "unknown".to_string());
        Self {
            hostname,
            cpus: num_cpus::get(),
            os: std::env::consts::OS.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportPayload {
    pub session_id: String,
    pub generated_at: DateTime<Utc>,
    pub host: HostInfo,
    pub results: Vec<BenchmarkResult>,
    #[serde(default)]
    pub metrics: Vec<MetricsSnapshot>,
}

impl ReportPayload {
    pub fn new(session_id: &str, results: &[BenchmarkResult], metrics: &[MetricsSnapshot]) -> Self {
        Self {
            session_id: session_id.to_string(),
            generated_at: Utc::now(),
            host: HostInfo::current(),
            results: results.to_vec(),
            metrics: metrics.to_vec(),
        }
    }
}

/// Write `payload` as pretty JSON to `path`
pub fn write_json_report(path: &Path, payload: &ReportPayload) -> Result<()> {
    let context = || format!("writing JSON report {}", path.display());
    let file = File::create(path).map_err(|e| Error::io(context(), e))?;
    let mut out = BufWriter::new(file);

    serde_json::to_writer_pretty(&mut out, payload)?;
    writeln!(out).map_err(|e| Error::io(context(), e))?;
    out.flush().map_err(|e| Error::io(context(), e))?;
    Ok(())
}

pub fn read_json_report(path: &Path) -> Result<ReportPayload> {
    let file = File::open(path).map_err(|e| Error::io(format!("reading JSON report {}", path.display()), e))?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TestType;
    use std::time::Duration;
    use tempfile::TempDir;

    fn sample_payload() -> ReportPayload {
        let results = vec![
            BenchmarkResult {
                run_id: 1,
                test_type: TestType::SeqWrite,
                bytes_processed: 8 * 1024 * 1024,
                elapsed: Duration::from_micros(41_337),
                throughput_mbps: 8.0 / 0.041337,
                avg_latency_ms: 41.0 / 64.0,
                iops: 64.0 / 0.041337,
                timestamp: Utc::now(),
            },
            BenchmarkResult {
                run_id: 2,
                test_type: TestType::RandRead,
                bytes_processed: 8 * 1024 * 1024,
                elapsed: Duration::from_millis(12),
                throughput_mbps: 666.666_666_666_666_6,
                avg_latency_ms: 0.1875,
                iops: 5333.333_333_333_333,
                timestamp: Utc::now(),
            },
        ];
        let metrics = vec![MetricsSnapshot::now(12.5, 40.0, 3.25, Some(37.0))];
        ReportPayload::new("sm-0123456789ab", &results, &metrics)
    }

    #[test]
    fn test_json_report_reads_back_equal() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("report.json");
        let payload = sample_payload();

        write_json_report(&path, &payload).unwrap();
        let parsed = read_json_report(&path).unwrap();

        assert_eq!(parsed, payload);
    }

    #[test]
    fn test_json_report_layout() {
        let value = serde_json::to_value(sample_payload()).unwrap();
        assert_eq!(value["sessionId"], "sm-0123456789ab");
        assert!(value["generatedAt"].is_string());
        assert!(value["host"]["cpus"].as_u64().unwrap() >= 1);
        assert_eq!(value["results"].as_array().unwrap().len(), 2);
        assert_eq!(value["results"][1]["testType"], "RAND_READ");
        assert_eq!(value["metrics"][0]["cpuPercent"], 12.5);
        assert_eq!(value["metrics"][0]["diskTemperatureC"], 37.0);
    }

    #[test]
    fn test_read_json_report_rejects_garbage() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(read_json_report(&path), Err(Error::Serialize(_))));
        assert!(matches!(read_json_report(&dir.path().join("none.json")), Err(Error::Io { .. })));
    }
}
