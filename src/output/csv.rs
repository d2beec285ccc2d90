//! CSV output formatting
//!
//! One row per measured run, in run-id order. The format is meant for
//! spreadsheets and pandas; every field is free of commas and quotes, so no
//! escaping is needed.

use crate::error::Error;
use crate::stats::BenchmarkResult;
use crate::Result;
use chrono::SecondsFormat;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

pub const CSV_HEADER: &str = "RunId,TestType,BytesProcessed,ElapsedMs,ThroughputMBps,AvgLatencyMs,IOPS,Timestamp";

/// Format a single result as a CSV row (no trailing newline)
pub fn format_csv_row(result: &BenchmarkResult) -> String {
    format!(
        "{},{},{},{},{:.2},{:.2},{:.2},{}",
        result.run_id,
        result.test_type,
        result.bytes_processed,
        result.elapsed_ms(),
        result.throughput_mbps,
        result.avg_latency_ms,
        result.iops,
        result.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
    )
}

/// Write the header and one row per result to `path`
pub fn write_csv_report(path: &Path, results: &[BenchmarkResult]) -> Result<()> {
    let context = || format!("writing CSV report {}", path.display());
    let file = File::create(path).map_err(|e| Error::io(context(), e))?;
    let mut out = BufWriter::new(file);

    writeln!(out, "{}", CSV_HEADER).map_err(|e| Error::io(context(), e))?;
    for result in results {
        writeln!(out, "{}", format_csv_row(result)).map_err(|e| Error::io(context(), e))?;
    }
    out.flush().map_err(|e| Error::io(context(), e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TestType;
    use chrono::{TimeZone, Utc};
    use std::time::Duration;
    use tempfile::TempDir;

    fn result(run_id: u32, test_type: TestType) -> BenchmarkResult {
        BenchmarkResult {
            run_id,
            test_type,
            bytes_processed: 1_048_576,
            elapsed: Duration::from_millis(250),
            throughput_mbps: 4.0,
            avg_latency_ms: 1.0 / 3.0,
            iops: 1024.0,
            timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap(),
        }
    }

    #[test]
    fn test_format_csv_row() {
        assert_eq!(
            format_csv_row(&result(7, TestType::RandRead)),
            "7,RAND_READ,1048576,250,4.00,0.33,1024.00,2024-03-01T12:30:00.000Z"
        );
    }

    #[test]
    fn test_write_csv_report() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("report.csv");
        let results = vec![result(1, TestType::SeqRead), result(2, TestType::SeqWrite)];

        write_csv_report(&path, &results).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], CSV_HEADER);
        assert!(lines[1].starts_with("1,SEQ_READ,"));
        assert!(lines[2].starts_with("2,SEQ_WRITE,"));
        for line in &lines {
            assert_eq!(line.split(',').count(), 8);
        }
    }

    #[test]
    fn test_write_csv_report_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.csv");
        write_csv_report(&path, &[]).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), format!("{}\n", CSV_HEADER));
    }

    #[test]
    fn test_write_csv_report_bad_path() {
        let dir = TempDir::new().unwrap();
        let err = write_csv_report(&dir.path().join("missing/report.csv"), &[]).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }
}
