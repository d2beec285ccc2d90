//! TOML configuration file support
//!
//! A config file may set any session parameter. Sizes and durations use the
//! same human-readable strings as the CLI:
//!
//! ```toml
//! directory = "/mnt/nvme0/bench"
//! tests = ["SEQ_WRITE", "RAND_READ"]
//! file_size = "2G"
//! block_size = "4k"
//! threads = 8
//! queue_depth = 16
//! iterations = 5
//! seed = 42
//!
//! [metrics]
//! enabled = true
//! interval = "250ms"
//!
//! [report]
//! formats = ["csv", "json", "html"]
//! embed_charts = true
//! ```

use super::cli_convert::{parse_duration, parse_size};
use super::{BenchmarkConfigBuilder, IoMode, ReportFormat, TestType};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Raw contents of a config file; every field is optional
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub directory: Option<PathBuf>,
    pub tests: Option<Vec<TestType>>,
    pub file_size: Option<String>,
    pub block_size: Option<String>,
    pub threads: Option<usize>,
    pub iterations: Option<u32>,
    pub warmup: Option<u32>,
    pub mode: Option<IoMode>,
    pub queue_depth: Option<usize>,
    pub seed: Option<u64>,
    pub verbosity: Option<u8>,
    pub retain: Option<bool>,
    pub allow_raw_device: Option<bool>,
    pub session_id: Option<String>,
    pub max_per_test: Option<String>,
    #[serde(default)]
    pub metrics: MetricsSection,
    #[serde(default)]
    pub report: ReportSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricsSection {
    pub enabled: Option<bool>,
    pub interval: Option<String>,
    pub synthetic: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReportSection {
    pub formats: Option<Vec<ReportFormat>>,
    pub embed_charts: Option<bool>,
}

/// Parse a TOML configuration file
pub fn parse_toml_file(path: &Path) -> Result<ConfigFile> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_toml_string(&contents)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Parse TOML configuration from a string
pub fn parse_toml_string(contents: &str) -> Result<ConfigFile> {
    let file: ConfigFile = toml::from_str(contents).context("Invalid TOML")?;
    Ok(file)
}

impl ConfigFile {
    /// Whether the file asks for the synthetic metrics source
    pub fn synthetic_metrics(&self) -> bool {
        self.metrics.synthetic.unwrap_or(false)
    }

    /// Layer the file's values onto `builder`
    pub fn apply(&self, mut builder: BenchmarkConfigBuilder) -> Result<BenchmarkConfigBuilder> {
        if let Some(dir) = &self.directory {
            builder = builder.test_directory(dir);
        }
        if let Some(tests) = &self.tests {
            builder = builder.test_types(tests.iter().copied());
        }
        if let Some(size) = &self.file_size {
            builder = builder.file_size_bytes(parse_size(size).context("file_size")?);
        }
        if let Some(block) = &self.block_size {
            builder = builder.block_size_bytes(parse_size(block).context("block_size")?);
        }
        if let Some(threads) = self.threads {
            builder = builder.threads(threads);
        }
        if let Some(iterations) = self.iterations {
            builder = builder.iterations(iterations);
        }
        if let Some(warmup) = self.warmup {
            builder = builder.warmup_iterations(warmup);
        }
        if let Some(mode) = self.mode {
            builder = builder.io_mode(mode);
        }
        if let Some(depth) = self.queue_depth {
            builder = builder.queue_depth(depth);
        }
        if let Some(seed) = self.seed {
            builder = builder.random_seed(seed);
        }
        if let Some(verbosity) = self.verbosity {
            builder = builder.verbosity(verbosity);
        }
        if let Some(retain) = self.retain {
            builder = builder.retain_test_files(retain);
        }
        if let Some(allow) = self.allow_raw_device {
            builder = builder.allow_raw_device_access(allow);
        }
        if let Some(id) = &self.session_id {
            builder = builder.session_id(id.clone());
        }
        if let Some(target) = &self.max_per_test {
            builder = builder.max_per_test_target(parse_duration(target).context("max_per_test")?);
        }
        if let Some(enabled) = self.metrics.enabled {
            builder = builder.collect_system_metrics(enabled);
        }
        if let Some(interval) = &self.metrics.interval {
            builder = builder.metrics_poll_interval(parse_duration(interval).context("metrics.interval")?);
        }
        if let Some(formats) = &self.report.formats {
            builder = builder.report_formats(formats.iter().copied());
        }
        if let Some(embed) = self.report.embed_charts {
            builder = builder.embed_charts(embed);
        }
        Ok(builder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::cli::Cli;
    use crate::config::cli_convert::apply_cli;
    use clap::Parser;
    use std::time::Duration;

    const SAMPLE: &str = r#"
directory = "/mnt/bench"
tests = ["RAND_WRITE", "SEQ_READ"]
file_size = "2G"
block_size = "4k"
threads = 8
queue_depth = 16
iterations = 4
mode = "async"
seed = 42

[metrics]
interval = "250ms"
synthetic = true

[report]
formats = ["csv", "json", "html"]
embed_charts = true
"#;

    #[test]
    fn test_parse_toml_basic() {
        let file = parse_toml_string(SAMPLE).unwrap();
        let config = file.apply(BenchmarkConfigBuilder::new()).unwrap().build().unwrap();

        assert_eq!(config.test_directory(), Path::new("/mnt/bench"));
        assert_eq!(config.test_types(), &[TestType::RandWrite, TestType::SeqRead]);
        assert_eq!(config.file_size_bytes(), 2 * 1024 * 1024 * 1024);
        assert_eq!(config.block_size_bytes(), 4096);
        assert_eq!(config.threads(), 8);
        assert_eq!(config.queue_depth(), 16);
        assert_eq!(config.iterations(), 4);
        assert_eq!(config.io_mode(), IoMode::Async);
        assert_eq!(config.random_seed(), Some(42));
        assert_eq!(config.metrics_poll_interval(), Duration::from_millis(250));
        assert!(config.embed_charts());
        assert!(file.synthetic_metrics());
    }

    #[test]
    fn test_cli_overrides_file() {
        let file = parse_toml_string(SAMPLE).unwrap();
        let cli = Cli::try_parse_from(["storemark", "-n", "4", "-q", "8", "-i", "3"]).unwrap();

        let builder = file.apply(BenchmarkConfigBuilder::new()).unwrap();
        let config = apply_cli(&cli, builder).unwrap().build().unwrap();

        assert_eq!(config.threads(), 4);
        assert_eq!(config.queue_depth(), 8);
        assert_eq!(config.iterations(), 3);
        assert_eq!(config.block_size_bytes(), 4096);
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(parse_toml_string("threadz = 4").is_err());
    }

    #[test]
    fn test_parse_toml_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("bench.toml");
        std::fs::write(&path, "iterations = 6\n").unwrap();

        let file = parse_toml_file(&path).unwrap();
        assert_eq!(file.iterations, Some(6));
        assert!(parse_toml_file(&dir.path().join("missing.toml")).is_err());
    }
}
