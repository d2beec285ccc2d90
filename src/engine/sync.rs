//! Synchronous IO engine
//!
//! Blocking `pread`/`pwrite`/`fsync` through libc. Every submission runs to
//! completion inside `submit()`, so queue depth is always one and the
//! completion is available from the next `poll_completions()` call.
//!
//! Partial transfers are retried until the whole buffer has moved. A read that
//! hits end-of-file returns the bytes read so far; a write that makes no
//! progress is an error.

use super::{EngineCapabilities, EngineConfig, IOCompletion, IOEngine, IOOperation, OperationType};
use std::io;
use std::os::unix::io::RawFd;

/// Synchronous IO engine using pread/pwrite
pub struct SyncEngine {
    config: Option<EngineConfig>,

    /// Single completion slot (QD=1)
    pending_completion: Option<IOCompletion>,
}

impl SyncEngine {
    pub fn new() -> Self {
        Self {
            config: None,
            pending_completion: None,
        }
    }

    pub fn config(&self) -> Option<&EngineConfig> {
        self.config.as_ref()
    }

    /// Read into `buffer` at `offset`, retrying short reads until EOF
    fn do_read(fd: RawFd, buffer: &mut [u8], offset: u64) -> io::Result<usize> {
        let mut total_read = 0;

        while total_read < buffer.len() {
            let remaining = &mut buffer[total_read..];

            // SAFETY: `remaining` is a live, exclusively borrowed slice and the
            // length passed is its own length.
            let result = unsafe {
                libc::pread(
                    fd,
                    remaining.as_mut_ptr() as *mut libc::c_void,
                    remaining.len(),
                    (offset + total_read as u64) as libc::off_t,
                )
            };

            if result < 0 {
                let err = io::Error::last_os_error();
                if err.kind() == io::ErrorKind::Interrupted {
                    continue;
                }
                return Err(err);
            }

            if result == 0 {
                break;
            }

            total_read += result as usize;
        }

        Ok(total_read)
    }

    /// Write all of `buffer` at `offset`
    fn do_write(fd: RawFd, buffer: &[u8], offset: u64) -> io::Result<usize> {
        let mut total_written = 0;

        while total_written < buffer.len() {
            let remaining = &buffer[total_written..];

            // SAFETY: `remaining` is a live slice and the length passed is its own.
            let result = unsafe {
                libc::pwrite(
                    fd,
                    remaining.as_ptr() as *const libc::c_void,
                    remaining.len(),
                    (offset + total_written as u64) as libc::off_t,
                )
            };

            if result < 0 {
                let err = io::Error::last_os_error();
                if err.kind() == io::ErrorKind::Interrupted {
                    continue;
                }
                return Err(err);
            }

            if result == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::WriteZero,
                    format!("pwrite made no progress at offset {}", offset + total_written as u64),
                ));
            }

            total_written += result as usize;
        }

        Ok(total_written)
    }

    fn do_fsync(fd: RawFd) -> io::Result<usize> {
        // SAFETY: fsync only requires a descriptor; an invalid one yields EBADF.
        let result = unsafe { libc::fsync(fd) };

        if result < 0 {
            return Err(io::Error::last_os_error());
        }

        Ok(0)
    }
}

impl Default for SyncEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl IOEngine for SyncEngine {
    fn init(&mut self, config: &EngineConfig) -> io::Result<()> {
        self.config = Some(config.clone());
        Ok(())
    }

    fn submit(&mut self, op: IOOperation<'_>) -> io::Result<()> {
        if self.pending_completion.is_some() {
            return Err(io::Error::new(
                io::ErrorKind::WouldBlock,
                "sync engine already holds an uncollected completion",
            ));
        }

        let result = match op.op_type {
            OperationType::Read => Self::do_read(op.target_fd, op.buffer, op.offset),
            OperationType::Write => Self::do_write(op.target_fd, op.buffer, op.offset),
            OperationType::Fsync => Self::do_fsync(op.target_fd),
        };

        self.pending_completion = Some(IOCompletion {
            user_data: op.user_data,
            result,
            op_type: op.op_type,
        });

        Ok(())
    }

    fn poll_completions(&mut self) -> io::Result<Vec<IOCompletion>> {
        Ok(self.pending_completion.take().into_iter().collect())
    }

    fn cleanup(&mut self) -> io::Result<()> {
        self.pending_completion = None;
        Ok(())
    }

    fn capabilities(&self) -> EngineCapabilities {
        EngineCapabilities::default()
    }
}
