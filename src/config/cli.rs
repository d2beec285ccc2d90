//! CLI argument parsing using clap
//!
//! Every parameter is optional on the command line. Values that are not given
//! fall back to the TOML config file (if any) and then to builder defaults, so
//! the CLI only overrides what the user actually typed.

use clap::Parser;
use std::path::PathBuf;

/// storemark - storage throughput, latency and IOPS benchmark
#[derive(Parser, Debug, Default)]
#[command(name = "storemark")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Directory holding test files and reports (created if absent)
    #[arg(short = 'd', long = "directory", value_name = "DIR")]
    pub directory: Option<PathBuf>,

    /// Comma-separated test types (SEQ_READ,SEQ_WRITE,RAND_READ,RAND_WRITE)
    #[arg(short = 't', long = "tests", value_name = "TYPES")]
    pub tests: Option<String>,

    /// Test file size (e.g., 1G, 4096m)
    #[arg(short = 's', long = "size")]
    pub file_size: Option<String>,

    /// Block size for IO operations (e.g., 4k, 128k, 1m)
    #[arg(short = 'b', long = "block")]
    pub block_size: Option<String>,

    /// Number of worker threads
    #[arg(short = 'n', long)]
    pub threads: Option<usize>,

    /// Measured iterations per test type
    #[arg(short = 'i', long)]
    pub iterations: Option<u32>,

    /// Warmup iterations per test type (results discarded)
    #[arg(short = 'w', long)]
    pub warmup: Option<u32>,

    /// IO mode: sync (single stream) or async (worker pool)
    #[arg(short = 'm', long = "mode")]
    pub io_mode: Option<String>,

    /// Maximum chunks queued for the worker pool (1 to 2x threads)
    #[arg(short = 'q', long = "queue-depth")]
    pub queue_depth: Option<usize>,

    /// Seed for reproducible random offsets and write payloads
    #[arg(long, env = "STOREMARK_SEED")]
    pub seed: Option<u64>,

    /// Verbosity level: 0 (quiet), 1 (normal), 2 (debug)
    #[arg(short = 'v', long)]
    pub verbosity: Option<u8>,

    /// Keep test data files after the session
    #[arg(short = 'r', long)]
    pub retain: bool,

    /// Also write an HTML report with an embedded throughput chart
    #[arg(long)]
    pub html: bool,

    /// System metrics sampling interval (e.g., 500ms, 2s)
    #[arg(long = "metrics-interval")]
    pub metrics_interval: Option<String>,

    /// Disable system metrics sampling
    #[arg(long = "no-metrics")]
    pub no_metrics: bool,

    /// Use the synthetic metrics source instead of /proc
    #[arg(long = "synthetic-metrics")]
    pub synthetic_metrics: bool,

    /// Explicit session identifier (default: generated)
    #[arg(long = "session-id")]
    pub session_id: Option<String>,

    /// Soft time target per run; slower runs are reported (e.g., 10m)
    #[arg(long = "max-per-test")]
    pub max_per_test: Option<String>,

    /// Acknowledge raw device access (regular files are still used)
    #[arg(long = "allow-raw-device")]
    pub allow_raw_device: bool,

    /// TOML configuration file
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Validate and print the configuration without running
    #[arg(long = "dry-run")]
    pub dry_run: bool,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
