//! Configuration validation
//!
//! Every numeric parameter has an inclusive range. Validation stops at the
//! first violation and reports the offending field by name.

use super::{BenchmarkConfig, ReportFormat, GIB, KIB, MIB};
use crate::error::ConfigError;
use std::time::Duration;

pub const MIN_FILE_SIZE: u64 = GIB;
pub const MAX_FILE_SIZE: u64 = 10 * GIB;
pub const MIN_BLOCK_SIZE: u64 = 4 * KIB;
pub const MAX_BLOCK_SIZE: u64 = MIB;
pub const MIN_THREADS: usize = 1;
pub const MAX_THREADS: usize = 32;
pub const MIN_ITERATIONS: u32 = 3;
pub const MAX_ITERATIONS: u32 = 10;
pub const MAX_WARMUP_ITERATIONS: u32 = 5;
pub const MAX_VERBOSITY: u8 = 2;
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(100);
pub const MAX_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Validate a complete configuration
pub fn validate(config: &BenchmarkConfig) -> Result<(), ConfigError> {
    if config.test_directory().as_os_str().is_empty() {
        return Err(ConfigError::MissingDirectory);
    }

    check_range("file_size_bytes", config.file_size_bytes(), MIN_FILE_SIZE, MAX_FILE_SIZE)?;
    check_range("block_size_bytes", config.block_size_bytes(), MIN_BLOCK_SIZE, MAX_BLOCK_SIZE)?;
    check_range(
        "threads",
        config.threads() as u64,
        MIN_THREADS as u64,
        MAX_THREADS as u64,
    )?;
    check_range(
        "iterations",
        config.iterations() as u64,
        MIN_ITERATIONS as u64,
        MAX_ITERATIONS as u64,
    )?;
    check_range(
        "warmup_iterations",
        config.warmup_iterations() as u64,
        0,
        MAX_WARMUP_ITERATIONS as u64,
    )?;
    validate_queue_depth(config.queue_depth(), config.threads())?;
    check_range("verbosity", config.verbosity() as u64, 0, MAX_VERBOSITY as u64)?;
    validate_poll_interval(config.metrics_poll_interval())?;
    validate_report_formats(config.report_formats(), config.embed_charts())?;
    validate_session_id(config.session_id())?;

    Ok(())
}

/// Queue depth is bounded by twice the worker count
pub fn validate_queue_depth(queue_depth: usize, threads: usize) -> Result<(), ConfigError> {
    check_range("queue_depth", queue_depth as u64, 1, 2 * threads as u64)
}

/// Compared as `Duration` so sub-millisecond excess is not truncated away
pub fn validate_poll_interval(interval: Duration) -> Result<(), ConfigError> {
    if interval < MIN_POLL_INTERVAL || interval > MAX_POLL_INTERVAL {
        return Err(ConfigError::OutOfRange {
            field: "metrics_poll_interval_ms",
            min: MIN_POLL_INTERVAL.as_millis() as u64,
            max: MAX_POLL_INTERVAL.as_millis() as u64,
            value: interval.as_millis() as u64,
        });
    }
    Ok(())
}

pub fn validate_report_formats(formats: &[ReportFormat], embed_charts: bool) -> Result<(), ConfigError> {
    if !formats.contains(&ReportFormat::Csv) || !formats.contains(&ReportFormat::Json) {
        return Err(ConfigError::MissingMandatoryReport);
    }
    if embed_charts && !formats.contains(&ReportFormat::Html) {
        return Err(ConfigError::ChartsWithoutHtml);
    }
    Ok(())
}

/// Session ids end up in file names, so they must be a single path component
pub fn validate_session_id(id: &str) -> Result<(), ConfigError> {
    let bad = id.is_empty()
        || id == "."
        || id == ".."
        || id.chars().any(|c| c == '/' || c == '\\' || c.is_whitespace());
    if bad {
        return Err(ConfigError::InvalidSessionId(id.to_string()));
    }
    Ok(())
}

fn check_range(field: &'static str, value: u64, min: u64, max: u64) -> Result<(), ConfigError> {
    if value < min || value > max {
        return Err(ConfigError::OutOfRange {
            field,
            min,
            max,
            value,
        });
    }
    Ok(())
}
