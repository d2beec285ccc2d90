//! Session-scoped path allocation
//!
//! Every artifact of a session lives directly in the test directory and
//! carries the session id in its name:
//!
//! - `run-<NNN>.<descriptor>.<session>.bin` - measured run data files
//! - `run-<NNN>.<descriptor>.<session>.tmp` - warmup / scratch files
//! - `report.<session>.<ext>` - report artifacts
//! - `charts-<session>/` - chart images for the HTML report
//!
//! Names depend only on the session id, run id and descriptor, so two runs
//! never share a file. Before any run the directory is created if needed,
//! checked for write permission and checked for free space.

use crate::error::Error;
use crate::Result;
use chrono::{SecondsFormat, Utc};
use std::ffi::CString;
use std::fmt;
use std::fs;
use std::io;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Prefix shared by all run data and temp files
pub const RUN_FILE_PREFIX: &str = "run-";

/// Free space must exceed the requirement by this fraction (5%)
pub const FREE_SPACE_MARGIN_NUM: u64 = 21;
pub const FREE_SPACE_MARGIN_DEN: u64 = 20;

/// Returns usable bytes on the filesystem backing a path
pub type FreeSpaceFn = Arc<dyn Fn(&Path) -> io::Result<u64> + Send + Sync>;

/// Path allocator for one session
#[derive(Clone)]
pub struct BenchmarkPaths {
    base_dir: PathBuf,
    session_id: String,
    free_space: FreeSpaceFn,
}

impl fmt::Debug for BenchmarkPaths {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BenchmarkPaths")
            .field("base_dir", &self.base_dir)
            .field("session_id", &self.session_id)
            .finish_non_exhaustive()
    }
}

impl BenchmarkPaths {
    pub fn new(base_dir: impl Into<PathBuf>, session_id: impl Into<String>) -> Self {
        Self {
            base_dir: base_dir.into(),
            session_id: session_id.into(),
            free_space: Arc::new(available_space),
        }
    }

    /// Replace the free-space query (statvfs by default)
    pub fn with_free_space(
        mut self,
        query: impl Fn(&Path) -> io::Result<u64> + Send + Sync + 'static,
    ) -> Self {
        self.free_space = Arc::new(query);
        self
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Create the test directory if absent and verify it is writable
    ///
    /// # Errors
    ///
    /// [`Error::DirectoryUnusable`] if the path exists but is not a directory,
    /// cannot be created, or a zero-byte check file cannot be written.
    pub fn ensure_test_directory(&self) -> Result<()> {
        let dir = &self.base_dir;

        if dir.exists() {
            if !dir.is_dir() {
                return Err(self.unusable("exists but is not a directory"));
            }
        } else {
            fs::create_dir_all(dir)
                .map_err(|e| self.unusable(format!("cannot create directory: {}", e)))?;
            tracing::debug!(dir = %dir.display(), "created test directory");
        }

        let check = dir.join(format!(".write_check_{}", self.session_id));
        let written = fs::File::create(&check).and_then(|file| file.sync_all());

        if check.exists() {
            if let Err(e) = fs::remove_file(&check) {
                tracing::warn!(path = %check.display(), error = %e, "failed to delete write check file");
            }
        }

        written.map_err(|e| self.unusable(format!("write check failed: {}", e)))
    }

    /// Fail unless usable space is at least `required_bytes` plus 5%
    ///
    /// # Errors
    ///
    /// [`Error::InsufficientSpace`] when the margin is not met, [`Error::Io`]
    /// when the filesystem cannot be queried.
    pub fn validate_free_space(&self, required_bytes: u64) -> Result<()> {
        let available = (self.free_space)(&self.base_dir).map_err(|e| {
            Error::io(format!("querying free space on {}", self.base_dir.display()), e)
        })?;

        if !has_enough_space(available, required_bytes) {
            return Err(Error::InsufficientSpace {
                path: self.base_dir.clone(),
                required: required_with_margin(required_bytes),
                available,
            });
        }

        tracing::debug!(available, required_bytes, "free space check passed");
        Ok(())
    }

    /// Data file for a measured run
    pub fn test_file_path(&self, run_id: u32, descriptor: &str) -> PathBuf {
        self.run_file(run_id, descriptor, "bin")
    }

    /// Scratch file for a run (warmups use these)
    pub fn temp_file_path(&self, run_id: u32, descriptor: &str) -> PathBuf {
        self.run_file(run_id, descriptor, "tmp")
    }

    /// Report artifact; a leading dot on `extension` is ignored
    pub fn report_file_path(&self, extension: &str) -> PathBuf {
        let ext = extension.trim_start_matches('.');
        self.base_dir.join(format!("report.{}.{}", self.session_id, ext))
    }

    pub fn charts_dir(&self) -> PathBuf {
        self.base_dir.join(format!("charts-{}", self.session_id))
    }

    /// Create the charts directory and return its path
    pub fn ensure_charts_dir(&self) -> Result<PathBuf> {
        let dir = self.charts_dir();
        fs::create_dir_all(&dir)
            .map_err(|e| Error::io(format!("creating {}", dir.display()), e))?;
        Ok(dir)
    }

    /// Delete session and run files in the test directory, unless `retain`
    ///
    /// Failures are logged and skipped. Returns the number of files removed.
    pub fn cleanup_session_files(&self, retain: bool) -> usize {
        if retain {
            tracing::info!(dir = %self.base_dir.display(), "retaining test files");
            return 0;
        }

        let entries = match fs::read_dir(&self.base_dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(dir = %self.base_dir.display(), error = %e, "cleanup skipped");
                return 0;
            }
        };

        let mut removed = 0;
        for entry in entries.flatten() {
            let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if !is_file || !self.is_session_file(&name) {
                continue;
            }

            match fs::remove_file(entry.path()) {
                Ok(()) => removed += 1,
                Err(e) => {
                    tracing::warn!(path = %entry.path().display(), error = %e, "failed to delete test file")
                }
            }
        }

        tracing::debug!(removed, "session cleanup finished");
        removed
    }

    /// Short description for log banners
    pub fn header(&self) -> String {
        format!(
            "[storemark] session={} dir={} ts={}",
            self.session_id,
            self.base_dir.display(),
            Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
        )
    }

    fn is_session_file(&self, name: &str) -> bool {
        name.contains(self.session_id.as_str()) || name.starts_with(RUN_FILE_PREFIX)
    }

    fn run_file(&self, run_id: u32, descriptor: &str, ext: &str) -> PathBuf {
        self.base_dir.join(format!(
            "{}{:03}.{}.{}.{}",
            RUN_FILE_PREFIX,
            run_id,
            normalize_descriptor(descriptor),
            self.session_id,
            ext
        ))
    }

    fn unusable(&self, reason: impl Into<String>) -> Error {
        Error::DirectoryUnusable {
            path: self.base_dir.clone(),
            reason: reason.into(),
        }
    }
}

/// Collapse whitespace runs into `.`; empty descriptors become `data`
pub fn normalize_descriptor(descriptor: &str) -> String {
    let parts: Vec<&str> = descriptor.split_whitespace().collect();
    if parts.is_empty() {
        "data".to_string()
    } else {
        parts.join(".")
    }
}

/// `available >= required * 1.05`, computed without rounding
pub fn has_enough_space(available: u64, required: u64) -> bool {
    available as u128 * FREE_SPACE_MARGIN_DEN as u128 >= required as u128 * FREE_SPACE_MARGIN_NUM as u128
}

/// Required bytes including the margin, rounded up
pub fn required_with_margin(required: u64) -> u64 {
    let scaled = (required as u128 * FREE_SPACE_MARGIN_NUM as u128).div_ceil(FREE_SPACE_MARGIN_DEN as u128);
    u64::try_from(scaled).unwrap_or(u64::MAX)
}

/// Usable bytes for unprivileged users on the filesystem holding `path`
pub fn available_space(path: &Path) -> io::Result<u64> {
    let c_path = CString::new(path.as_os_str().as_bytes())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "path contains NUL byte"))?;

    // SAFETY: statvfs only writes into the zeroed struct we pass in.
    let mut stat: libc::statvfs = unsafe { std::mem::zeroed() };
    let result = unsafe { libc::statvfs(c_path.as_ptr(), &mut stat) };
    if result != 0 {
        return Err(io::Error::last_os_error());
    }

    Ok(stat.f_bavail as u64 * stat.f_frsize as u64)
}
