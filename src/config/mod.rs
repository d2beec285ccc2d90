//! Configuration management
//!
//! A benchmark session is driven by a single [`BenchmarkConfig`]. It is built
//! once through [`BenchmarkConfigBuilder`], which applies defaults for every
//! parameter that was not supplied and then validates the complete set. The
//! result is immutable and shared between the orchestrator, executors and
//! workers behind an `Arc`.
//!
//! Configuration can come from three layers, highest precedence first:
//!
//! 1. CLI arguments ([`cli`])
//! 2. A TOML configuration file ([`toml`])
//! 3. Builder defaults
//!
//! # Example
//!
//! ```
//! use storemark::config::{BenchmarkConfig, TestType};
//!
//! let config = BenchmarkConfig::builder()
//!     .test_directory("/tmp/storemark")
//!     .test_types([TestType::RandRead])
//!     .block_size_bytes(4096)
//!     .random_seed(42)
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(config.blocks_per_file(), 5 * 1024 * 1024 * 1024 / 4096);
//! ```

pub mod cli;
pub mod cli_convert;
pub mod toml;
pub mod validator;

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

pub const KIB: u64 = 1024;
pub const MIB: u64 = 1024 * KIB;
pub const GIB: u64 = 1024 * MIB;

/// Prefix of generated session identifiers
pub const SESSION_PREFIX: &str = "sm-";

/// Workload type for a single run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TestType {
    SeqRead,
    SeqWrite,
    RandRead,
    RandWrite,
}

impl TestType {
    pub const ALL: [TestType; 4] = [
        TestType::SeqRead,
        TestType::SeqWrite,
        TestType::RandRead,
        TestType::RandWrite,
    ];

    /// Canonical upper-case name (`SEQ_READ`)
    pub fn as_str(&self) -> &'static str {
        match self {
            TestType::SeqRead => "SEQ_READ",
            TestType::SeqWrite => "SEQ_WRITE",
            TestType::RandRead => "RAND_READ",
            TestType::RandWrite => "RAND_WRITE",
        }
    }

    /// Lower-case name used in data file names (`seq_read`)
    pub fn descriptor(&self) -> &'static str {
        match self {
            TestType::SeqRead => "seq_read",
            TestType::SeqWrite => "seq_write",
            TestType::RandRead => "rand_read",
            TestType::RandWrite => "rand_write",
        }
    }

    pub fn is_write(&self) -> bool {
        matches!(self, TestType::SeqWrite | TestType::RandWrite)
    }

    pub fn is_random(&self) -> bool {
        matches!(self, TestType::RandRead | TestType::RandWrite)
    }
}

impl fmt::Display for TestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TestType {
    type Err = ConfigError;

    /// Accepts `SEQ_READ`, `seq-read`, `seqread` and similar spellings
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | ' '))
            .collect::<String>()
            .to_ascii_lowercase();

        match normalized.as_str() {
            "seqread" => Ok(TestType::SeqRead),
            "seqwrite" => Ok(TestType::SeqWrite),
            "randread" | "randomread" => Ok(TestType::RandRead),
            "randwrite" | "randomwrite" => Ok(TestType::RandWrite),
            _ => Err(ConfigError::UnknownValue {
                kind: "test type",
                value: s.to_string(),
            }),
        }
    }
}

/// How a run drives its I/O
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IoMode {
    /// One stream of blocking operations per run
    Sync,
    /// Fixed worker pool, each worker driving its own file sub-ranges
    Async,
}

impl fmt::Display for IoMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IoMode::Sync => f.write_str("sync"),
            IoMode::Async => f.write_str("async"),
        }
    }
}

impl FromStr for IoMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sync" | "synchronous" => Ok(IoMode::Sync),
            "async" | "asynchronous" => Ok(IoMode::Async),
            _ => Err(ConfigError::UnknownValue {
                kind: "io mode",
                value: s.to_string(),
            }),
        }
    }
}

/// Report artifact format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    Csv,
    Json,
    Html,
}

impl ReportFormat {
    /// File extension, without the leading dot
    pub fn extension(&self) -> &'static str {
        match self {
            ReportFormat::Csv => "csv",
            ReportFormat::Json => "json",
            ReportFormat::Html => "html",
        }
    }
}

impl FromStr for ReportFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(ReportFormat::Csv),
            "json" => Ok(ReportFormat::Json),
            "html" => Ok(ReportFormat::Html),
            _ => Err(ConfigError::UnknownValue {
                kind: "report format",
                value: s.to_string(),
            }),
        }
    }
}

/// Validated, immutable parameter set for one benchmark session
#[derive(Debug, Clone, Serialize)]
pub struct BenchmarkConfig {
    test_directory: PathBuf,
    test_types: Vec<TestType>,
    file_size_bytes: u64,
    block_size_bytes: u64,
    threads: usize,
    iterations: u32,
    warmup_iterations: u32,
    io_mode: IoMode,
    queue_depth: usize,
    random_seed: Option<u64>,
    allow_raw_device_access: bool,
    retain_test_files: bool,
    verbosity: u8,
    collect_system_metrics: bool,
    metrics_poll_interval: Duration,
    report_formats: Vec<ReportFormat>,
    embed_charts: bool,
    max_per_test_target: Duration,
    session_id: String,
}

impl BenchmarkConfig {
    pub fn builder() -> BenchmarkConfigBuilder {
        BenchmarkConfigBuilder::new()
    }

    pub fn test_directory(&self) -> &Path {
        &self.test_directory
    }

    /// Test types in the order they were configured, without duplicates
    pub fn test_types(&self) -> &[TestType] {
        &self.test_types
    }

    pub fn file_size_bytes(&self) -> u64 {
        self.file_size_bytes
    }

    pub fn block_size_bytes(&self) -> u64 {
        self.block_size_bytes
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    pub fn warmup_iterations(&self) -> u32 {
        self.warmup_iterations
    }

    pub fn io_mode(&self) -> IoMode {
        self.io_mode
    }

    pub fn queue_depth(&self) -> usize {
        self.queue_depth
    }

    pub fn random_seed(&self) -> Option<u64> {
        self.random_seed
    }

    pub fn allow_raw_device_access(&self) -> bool {
        self.allow_raw_device_access
    }

    pub fn retain_test_files(&self) -> bool {
        self.retain_test_files
    }

    pub fn verbosity(&self) -> u8 {
        self.verbosity
    }

    pub fn collect_system_metrics(&self) -> bool {
        self.collect_system_metrics
    }

    pub fn metrics_poll_interval(&self) -> Duration {
        self.metrics_poll_interval
    }

    pub fn report_formats(&self) -> &[ReportFormat] {
        &self.report_formats
    }

    pub fn has_report_format(&self, format: ReportFormat) -> bool {
        self.report_formats.contains(&format)
    }

    pub fn embed_charts(&self) -> bool {
        self.embed_charts
    }

    /// Soft time target for a single run; exceeding it is logged, not fatal
    pub fn max_per_test_target(&self) -> Duration {
        self.max_per_test_target
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Number of block operations needed to cover the file once
    pub fn blocks_per_file(&self) -> u64 {
        self.file_size_bytes.div_ceil(self.block_size_bytes)
    }

    pub fn has_random_workloads(&self) -> bool {
        self.test_types.iter().any(TestType::is_random)
    }

    pub fn has_sequential_workloads(&self) -> bool {
        self.test_types.iter().any(|t| !t.is_random())
    }

    /// Total number of executor invocations, warmups included
    pub fn total_runs(&self) -> u64 {
        self.test_types.len() as u64 * (self.iterations + self.warmup_iterations) as u64
    }
}

/// Builder that applies defaults and validates on [`build`](Self::build)
#[derive(Debug, Clone)]
pub struct BenchmarkConfigBuilder {
    test_directory: PathBuf,
    test_types: Vec<TestType>,
    file_size_bytes: u64,
    block_size_bytes: u64,
    threads: usize,
    iterations: u32,
    warmup_iterations: u32,
    io_mode: IoMode,
    queue_depth: usize,
    random_seed: Option<u64>,
    allow_raw_device_access: bool,
    retain_test_files: bool,
    verbosity: u8,
    collect_system_metrics: bool,
    metrics_poll_interval: Duration,
    report_formats: Vec<ReportFormat>,
    embed_charts: bool,
    max_per_test_target: Duration,
    session_id: Option<String>,
}

impl Default for BenchmarkConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl BenchmarkConfigBuilder {
    pub fn new() -> Self {
        Self {
            test_directory: PathBuf::from("./storemark-tests"),
            test_types: Vec::new(),
            file_size_bytes: 5 * GIB,
            block_size_bytes: 128 * KIB,
            threads: 4,
            iterations: 5,
            warmup_iterations: 1,
            io_mode: IoMode::Sync,
            queue_depth: 8,
            random_seed: None,
            allow_raw_device_access: false,
            retain_test_files: false,
            verbosity: 1,
            collect_system_metrics: true,
            metrics_poll_interval: Duration::from_millis(500),
            report_formats: vec![ReportFormat::Csv, ReportFormat::Json],
            embed_charts: false,
            max_per_test_target: Duration::from_secs(10 * 60),
            session_id: None,
        }
    }

    pub fn test_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.test_directory = dir.into();
        self
    }

    /// Replace the test type list
    pub fn test_types(mut self, types: impl IntoIterator<Item = TestType>) -> Self {
        self.test_types.clear();
        for t in types {
            self = self.add_test_type(t);
        }
        self
    }

    /// Append a test type, ignoring duplicates
    pub fn add_test_type(mut self, test_type: TestType) -> Self {
        if !self.test_types.contains(&test_type) {
            self.test_types.push(test_type);
        }
        self
    }

    pub fn file_size_bytes(mut self, bytes: u64) -> Self {
        self.file_size_bytes = bytes;
        self
    }

    pub fn block_size_bytes(mut self, bytes: u64) -> Self {
        self.block_size_bytes = bytes;
        self
    }

    pub fn threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn iterations(mut self, iterations: u32) -> Self {
        self.iterations = iterations;
        self
    }

    pub fn warmup_iterations(mut self, warmup: u32) -> Self {
        self.warmup_iterations = warmup;
        self
    }

    pub fn io_mode(mut self, mode: IoMode) -> Self {
        self.io_mode = mode;
        self
    }

    pub fn queue_depth(mut self, depth: usize) -> Self {
        self.queue_depth = depth;
        self
    }

    pub fn random_seed(mut self, seed: u64) -> Self {
        self.random_seed = Some(seed);
        self
    }

    pub fn allow_raw_device_access(mut self, allow: bool) -> Self {
        self.allow_raw_device_access = allow;
        self
    }

    pub fn retain_test_files(mut self, retain: bool) -> Self {
        self.retain_test_files = retain;
        self
    }

    pub fn verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    pub fn collect_system_metrics(mut self, collect: bool) -> Self {
        self.collect_system_metrics = collect;
        self
    }

    pub fn metrics_poll_interval(mut self, interval: Duration) -> Self {
        self.metrics_poll_interval = interval;
        self
    }

    /// Replace the report format list
    pub fn report_formats(mut self, formats: impl IntoIterator<Item = ReportFormat>) -> Self {
        self.report_formats.clear();
        for f in formats {
            self = self.add_report_format(f);
        }
        self
    }

    /// Append a report format, ignoring duplicates
    pub fn add_report_format(mut self, format: ReportFormat) -> Self {
        if !self.report_formats.contains(&format) {
            self.report_formats.push(format);
        }
        self
    }

    pub fn embed_charts(mut self, embed: bool) -> Self {
        self.embed_charts = embed;
        self
    }

    pub fn max_per_test_target(mut self, target: Duration) -> Self {
        self.max_per_test_target = target;
        self
    }

    pub fn session_id(mut self, id: impl Into<String>) -> Self {
        self.session_id = Some(id.into());
        self
    }

    /// Apply remaining defaults and validate
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found; see [`validator::validate`].
    pub fn build(self) -> Result<BenchmarkConfig, ConfigError> {
        let test_types = if self.test_types.is_empty() {
            vec![TestType::SeqRead, TestType::SeqWrite]
        } else {
            self.test_types
        };

        let config = BenchmarkConfig {
            test_directory: self.test_directory,
            test_types,
            file_size_bytes: self.file_size_bytes,
            block_size_bytes: self.block_size_bytes,
            threads: self.threads,
            iterations: self.iterations,
            warmup_iterations: self.warmup_iterations,
            io_mode: self.io_mode,
            queue_depth: self.queue_depth,
            random_seed: self.random_seed,
            allow_raw_device_access: self.allow_raw_device_access,
            retain_test_files: self.retain_test_files,
            verbosity: self.verbosity,
            collect_system_metrics: self.collect_system_metrics,
            metrics_poll_interval: self.metrics_poll_interval,
            report_formats: self.report_formats,
            embed_charts: self.embed_charts,
            max_per_test_target: self.max_per_test_target,
            session_id: self.session_id.unwrap_or_else(generate_session_id),
        };

        validator::validate(&config)?;
        Ok(config)
    }
}

/// Generate a fresh session identifier (`sm-` followed by 12 hex characters)
pub fn generate_session_id() -> String {
    let hex = uuid::Uuid::new_v4().simple().to_string();
    format!("{}{}", SESSION_PREFIX, &hex[..12])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BenchmarkConfig::builder().build().unwrap();
        assert_eq!(config.test_types(), &[TestType::SeqRead, TestType::SeqWrite]);
        assert_eq!(config.file_size_bytes(), 5 * GIB);
        assert_eq!(config.block_size_bytes(), 128 * KIB);
        assert_eq!(config.threads(), 4);
        assert_eq!(config.iterations(), 5);
        assert_eq!(config.warmup_iterations(), 1);
        assert_eq!(config.io_mode(), IoMode::Sync);
        assert_eq!(config.queue_depth(), 8);
        assert_eq!(config.verbosity(), 1);
        assert_eq!(config.metrics_poll_interval(), Duration::from_millis(500));
        assert_eq!(config.report_formats(), &[ReportFormat::Csv, ReportFormat::Json]);
        assert!(config.collect_system_metrics());
        assert!(!config.embed_charts());
        assert!(!config.retain_test_files());
        assert!(config.random_seed().is_none());
    }

    #[test]
    fn test_session_id_format() {
        let id = generate_session_id();
        assert!(id.starts_with(SESSION_PREFIX));
        assert_eq!(id.len(), SESSION_PREFIX.len() + 12);
        assert!(id[SESSION_PREFIX.len()..].chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(id, generate_session_id());
    }

    #[test]
    fn test_test_types_keep_order_and_dedupe() {
        let config = BenchmarkConfig::builder()
            .test_types([
                TestType::RandWrite,
                TestType::SeqRead,
                TestType::RandWrite,
            ])
            .build()
            .unwrap();
        assert_eq!(config.test_types(), &[TestType::RandWrite, TestType::SeqRead]);
        assert!(config.has_random_workloads());
        assert!(config.has_sequential_workloads());
    }

    #[test]
    fn test_blocks_per_file_rounds_up() {
        let config = BenchmarkConfig::builder()
            .file_size_bytes(GIB)
            .block_size_bytes(5000)
            .build()
            .unwrap();
        assert_eq!(config.blocks_per_file(), GIB / 5000 + 1);

        let config = BenchmarkConfig::builder()
            .file_size_bytes(GIB)
            .block_size_bytes(4 * KIB)
            .build()
            .unwrap();
        assert_eq!(config.blocks_per_file(), 262_144);
    }

    #[test]
    fn test_test_type_parsing() {
        assert_eq!("SEQ_READ".parse::<TestType>().unwrap(), TestType::SeqRead);
        assert_eq!("seq-write".parse::<TestType>().unwrap(), TestType::SeqWrite);
        assert_eq!("randread".parse::<TestType>().unwrap(), TestType::RandRead);
        assert_eq!(" Rand_Write ".parse::<TestType>().unwrap(), TestType::RandWrite);
        assert!("mixed".parse::<TestType>().is_err());
    }

    #[test]
    fn test_test_type_names() {
        for t in TestType::ALL {
            assert_eq!(t.to_string(), t.as_str());
            assert_eq!(t.descriptor(), t.as_str().to_lowercase());
            assert_eq!(t.as_str().parse::<TestType>().unwrap(), t);
        }
        assert!(TestType::RandWrite.is_write() && TestType::RandWrite.is_random());
        assert!(!TestType::SeqRead.is_write() && !TestType::SeqRead.is_random());
    }

    #[test]
    fn test_test_type_serde_names() {
        let json = serde_json::to_string(&TestType::RandRead).unwrap();
        assert_eq!(json, "\"RAND_READ\"");
    }

    #[test]
    fn test_total_runs() {
        let config = BenchmarkConfig::builder()
            .test_types([TestType::SeqRead, TestType::SeqWrite])
            .iterations(3)
            .warmup_iterations(2)
            .build()
            .unwrap();
        assert_eq!(config.total_runs(), 10);
    }
}
