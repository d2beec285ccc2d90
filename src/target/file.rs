//! Test data file
//!
//! A [`TestFile`] is the single regular file a run drives its I/O against.
//! It is opened read-write, created if missing, and extended with `ftruncate`
//! to the nominal run size so reads never start past end-of-file. Existing
//! content is kept.
//!
//! Read runs need real data under every block. A freshly sized file is
//! sparse and reads of its holes never reach the device, so the executor
//! writes the file once before timing and then calls
//! [`TestFile::drop_cache`] to evict the pages it just wrote.
//!
//! The raw descriptor is handed to IO engines; the file is closed explicitly
//! through [`TestFile::close`] so close failures are reported instead of
//! being swallowed on drop.

use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::io::{AsRawFd, IntoRawFd, RawFd};
use std::path::{Path, PathBuf};

/// Open handle on a run's data file
#[derive(Debug)]
pub struct TestFile {
    path: PathBuf,
    file: File,
    size: u64,
}

impl TestFile {
    /// Open (creating if necessary) `path` and make it at least `size` bytes
    pub fn open(path: &Path, size: u64) -> io::Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        let current = file.metadata()?.len();
        if current < size {
            file.set_len(size)?;
        }

        Ok(Self {
            path: path.to_path_buf(),
            file,
            size: current.max(size),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Size of the file right after opening
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn fd(&self) -> RawFd {
        self.file.as_raw_fd()
    }

    /// Ask the kernel to drop cached pages of the whole file
    ///
    /// Only clean pages are dropped, so call it after an fsync.
    pub fn drop_cache(&self) -> io::Result<()> {
        // SAFETY: the descriptor is owned by `self.file` and open.
        let result = unsafe { libc::posix_fadvise(self.fd(), 0, 0, libc::POSIX_FADV_DONTNEED) };
        if result != 0 {
            return Err(io::Error::from_raw_os_error(result));
        }
        Ok(())
    }

    /// Close the descriptor, reporting any error from `close(2)`
    pub fn close(self) -> io::Result<()> {
        let fd = self.file.into_raw_fd();
        // SAFETY: `into_raw_fd` transferred ownership of a valid descriptor to us
        // and nothing else closes it.
        let result = unsafe { libc::close(fd) };
        if result < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_open_creates_and_sizes() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("run-001.seq_write.sm-x.bin");

        let file = TestFile::open(&path, 1024 * 1024).unwrap();
        assert_eq!(file.size(), 1024 * 1024);
        assert_eq!(file.path(), path.as_path());
        assert!(file.fd() >= 0);
        file.close().unwrap();

        assert_eq!(std::fs::metadata(&path).unwrap().len(), 1024 * 1024);
    }

    #[test]
    fn test_open_keeps_larger_existing_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("existing.bin");
        std::fs::write(&path, vec![7u8; 8192]).unwrap();

        let file = TestFile::open(&path, 4096).unwrap();
        assert_eq!(file.size(), 8192);
        file.close().unwrap();

        let content = std::fs::read(&path).unwrap();
        assert_eq!(content.len(), 8192);
        assert!(content.iter().all(|&b| b == 7));
    }

    #[test]
    fn test_drop_cache_keeps_content() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("cached.bin");
        std::fs::write(&path, vec![3u8; 65536]).unwrap();

        let file = TestFile::open(&path, 65536).unwrap();
        file.drop_cache().unwrap();
        file.close().unwrap();

        let content = std::fs::read(&path).unwrap();
        assert!(content.iter().all(|&b| b == 3));
    }

    #[test]
    fn test_open_fails_in_missing_directory() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nope").join("file.bin");
        assert!(TestFile::open(&path, 4096).is_err());
    }
}
