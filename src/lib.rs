//! storemark - Storage benchmark
//!
//! storemark measures storage throughput, latency and IOPS under sequential and
//! random read/write workloads against regular files in a user-designated
//! directory, and reports per-run and aggregated statistics.
//!
//! # Architecture
//!
//! - **Configuration**: validated, immutable parameter set for one session
//! - **Path allocation**: session-scoped file naming, free-space and write checks
//! - **Workload execution**: timed I/O loops over pluggable IO engines
//! - **Orchestration**: test types × iterations, run ids, sampler lifecycle
//! - **Resource sampling**: background CPU/RAM/disk snapshots
//! - **Reporting**: CSV, JSON, HTML and console summaries
//!
//! # Example
//!
//! ```no_run
//! use storemark::config::{BenchmarkConfig, TestType};
//! use storemark::coordinator::RunOrchestrator;
//! use std::sync::Arc;
//!
//! let config = BenchmarkConfig::builder()
//!     .test_directory("/mnt/scratch/storemark")
//!     .test_types([TestType::SeqWrite, TestType::SeqRead])
//!     .iterations(3)
//!     .build()
//!     .unwrap();
//!
//! let mut orchestrator = RunOrchestrator::new(Arc::new(config));
//! let results = orchestrator.run_all().unwrap();
//! println!("{} runs", results.len());
//! ```

pub mod config;
pub mod coordinator;
pub mod engine;
pub mod error;
pub mod monitor;
pub mod output;
pub mod stats;
pub mod target;
pub mod util;
pub mod worker;

// Re-export commonly used types
pub use config::{BenchmarkConfig, TestType};
pub use engine::IOEngine;
pub use error::Error;
pub use stats::BenchmarkResult;

/// Result type used throughout storemark
pub type Result<T> = std::result::Result<T, Error>;
