//! IO targets
//!
//! - [`paths`]: session-scoped naming, directory and free-space checks
//! - [`file`]: the regular file a run performs its I/O against

pub mod file;
pub mod paths;

pub use file::TestFile;
pub use paths::BenchmarkPaths;
