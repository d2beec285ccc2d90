//! Error types
//!
//! Errors fall into four groups that determine how far they propagate:
//!
//! - **Configuration errors** fail at construction time and never reach a run
//! - **Directory/space errors** fail session setup before any file is created
//! - **Run I/O errors** abort the whole session without retry
//! - **Cleanup errors** are logged and swallowed (they never appear here)

use crate::config::TestType;
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Top-level error for every fallible storemark operation
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("test directory {} is unusable: {reason}", path.display())]
    DirectoryUnusable { path: PathBuf, reason: String },

    #[error(
        "insufficient free space on {}: need {required} bytes (including 5% margin), {available} available",
        path.display()
    )]
    InsufficientSpace {
        path: PathBuf,
        required: u64,
        available: u64,
    },

    #[error("run {run_id} ({test_type}) failed during {op}: {source}")]
    RunIo {
        run_id: u32,
        test_type: TestType,
        op: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("run {run_id} ({test_type}) cannot be timed: {ops} ops in {elapsed:?}")]
    DegenerateTiming {
        run_id: u32,
        test_type: TestType,
        ops: u64,
        elapsed: Duration,
    },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    #[error("report serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl Error {
    /// Wrap an I/O error with a short description of what was being done
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        Error::Io {
            context: context.into(),
            source,
        }
    }
}

/// Parameter validation failure, naming the offending field
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: &'static str,
        min: u64,
        max: u64,
        value: u64,
    },

    #[error("test_directory must not be empty")]
    MissingDirectory,

    #[error("report_formats must include both CSV and JSON")]
    MissingMandatoryReport,

    #[error("embed_charts requires the HTML report format")]
    ChartsWithoutHtml,

    #[error("session_id {0:?} must be non-empty and contain no whitespace or path separators")]
    InvalidSessionId(String),

    #[error("unknown {kind} {value:?}")]
    UnknownValue { kind: &'static str, value: String },
}

impl ConfigError {
    /// Name of the field the error refers to, when there is exactly one
    pub fn field(&self) -> Option<&'static str> {
        match self {
            ConfigError::OutOfRange { field, .. } => Some(field),
            ConfigError::MissingDirectory => Some("test_directory"),
            ConfigError::MissingMandatoryReport => Some("report_formats"),
            ConfigError::ChartsWithoutHtml => Some("embed_charts"),
            ConfigError::InvalidSessionId(_) => Some("session_id"),
            ConfigError::UnknownValue { .. } => None,
        }
    }
}
