//! Conversion of CLI strings into typed configuration values

use super::cli::Cli;
use super::{BenchmarkConfigBuilder, IoMode, ReportFormat, TestType};
use anyhow::{Context, Result};
use std::time::Duration;

/// Parse a size string (e.g., "4k", "1M", "1G") to bytes
pub fn parse_size(s: &str) -> Result<u64> {
    let s = s.trim().to_lowercase();

    let (num_str, multiplier) = if let Some(n) = strip_any(&s, &["kib", "kb", "k"]) {
        (n, 1024u64)
    } else if let Some(n) = strip_any(&s, &["mib", "mb", "m"]) {
        (n, 1024 * 1024)
    } else if let Some(n) = strip_any(&s, &["gib", "gb", "g"]) {
        (n, 1024 * 1024 * 1024)
    } else {
        (s.trim_end_matches('b'), 1)
    };

    let num: u64 = num_str
        .trim()
        .parse()
        .with_context(|| format!("Invalid size format: {}", s))?;

    num.checked_mul(multiplier)
        .with_context(|| format!("Size out of range: {}", s))
}

/// Parse a duration string (e.g., "500ms", "2s", "10m", "1h")
pub fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim().to_lowercase();

    let (num_str, millis) = if let Some(n) = s.strip_suffix("ms") {
        (n, 1u64)
    } else if let Some(n) = strip_any(&s, &["sec", "s"]) {
        (n, 1000)
    } else if let Some(n) = strip_any(&s, &["min", "m"]) {
        (n, 60_000)
    } else if let Some(n) = strip_any(&s, &["hr", "h"]) {
        (n, 3_600_000)
    } else {
        (s.as_str(), 1000)
    };

    let num: u64 = num_str
        .trim()
        .parse()
        .with_context(|| format!("Invalid duration format: {}", s))?;

    num.checked_mul(millis)
        .map(Duration::from_millis)
        .with_context(|| format!("Duration out of range: {}", s))
}

/// Parse a comma-separated test type list, keeping order
pub fn parse_test_types(s: &str) -> Result<Vec<TestType>> {
    s.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| part.parse::<TestType>().map_err(anyhow::Error::from))
        .collect()
}

/// Apply every CLI value that was given on top of `builder`
pub fn apply_cli(cli: &Cli, mut builder: BenchmarkConfigBuilder) -> Result<BenchmarkConfigBuilder> {
    if let Some(dir) = &cli.directory {
        builder = builder.test_directory(dir);
    }
    if let Some(tests) = &cli.tests {
        builder = builder.test_types(parse_test_types(tests)?);
    }
    if let Some(size) = &cli.file_size {
        builder = builder.file_size_bytes(parse_size(size).context("--size")?);
    }
    if let Some(block) = &cli.block_size {
        builder = builder.block_size_bytes(parse_size(block).context("--block")?);
    }
    if let Some(threads) = cli.threads {
        builder = builder.threads(threads);
    }
    if let Some(iterations) = cli.iterations {
        builder = builder.iterations(iterations);
    }
    if let Some(warmup) = cli.warmup {
        builder = builder.warmup_iterations(warmup);
    }
    if let Some(mode) = &cli.io_mode {
        builder = builder.io_mode(mode.parse::<IoMode>()?);
    }
    if let Some(depth) = cli.queue_depth {
        builder = builder.queue_depth(depth);
    }
    if let Some(seed) = cli.seed {
        builder = builder.random_seed(seed);
    }
    if let Some(verbosity) = cli.verbosity {
        builder = builder.verbosity(verbosity);
    }
    if cli.retain {
        builder = builder.retain_test_files(true);
    }
    if cli.html {
        builder = builder.add_report_format(ReportFormat::Html).embed_charts(true);
    }
    if let Some(interval) = &cli.metrics_interval {
        builder = builder.metrics_poll_interval(parse_duration(interval).context("--metrics-interval")?);
    }
    if cli.no_metrics {
        builder = builder.collect_system_metrics(false);
    }
    if let Some(id) = &cli.session_id {
        builder = builder.session_id(id.clone());
    }
    if let Some(target) = &cli.max_per_test {
        builder = builder.max_per_test_target(parse_duration(target).context("--max-per-test")?);
    }
    if cli.allow_raw_device {
        builder = builder.allow_raw_device_access(true);
    }
    Ok(builder)
}

fn strip_any<'a>(s: &'a str, suffixes: &[&str]) -> Option<&'a str> {
    suffixes.iter().find_map(|suffix| s.strip_suffix(suffix))
}
