//! IO engine abstraction
//!
//! An IO engine submits positioned read, write and fsync operations against an
//! open file descriptor and reports their completions. Workload execution is
//! written against the [`IOEngine`] trait only, so the timed loop does not
//! care whether operations hit the kernel ([`sync::SyncEngine`]) or are merely
//! recorded ([`mock::MockEngine`]).
//!
//! # Lifecycle
//!
//! 1. Create an engine (usually through an [`EngineFactory`])
//! 2. Call `init()` with an [`EngineConfig`]
//! 3. `submit()` operations and collect them with `poll_completions()`
//! 4. Call `cleanup()` when the run is done
//!
//! Each worker owns its own engine instance; engines are `Send` but never
//! shared between threads.
//!
//! # Example
//!
//! ```no_run
//! use storemark::engine::{complete_one, EngineConfig, IOEngine, IOOperation, OperationType};
//! use storemark::engine::sync::SyncEngine;
//! use storemark::target::TestFile;
//! use std::path::Path;
//!
//! let file = TestFile::open(Path::new("/tmp/data.bin"), 1 << 20)?;
//! let mut engine = SyncEngine::new();
//! engine.init(&EngineConfig::default())?;
//!
//! let mut buffer = vec![0u8; 4096];
//! let op = IOOperation::new(OperationType::Read, file.fd(), 0, &mut buffer);
//! let bytes = complete_one(&mut engine, op)?;
//! assert_eq!(bytes, 4096);
//!
//! engine.cleanup()?;
//! # Ok::<(), std::io::Error>(())
//! ```

use std::io;
use std::os::unix::io::RawFd;
use std::sync::Arc;

pub mod mock;
pub mod sync;

/// IO engine trait for all backends
///
/// Operations borrow their buffer only for the duration of `submit()`, so an
/// engine must finish with the buffer before `submit()` returns. Completions
/// may still be reported later through `poll_completions()`.
///
/// # Errors
///
/// `submit()` fails only when the operation cannot be accepted. Failures of
/// the I/O itself are reported in [`IOCompletion::result`].
pub trait IOEngine: Send {
    /// Prepare the engine; called once before any submission
    fn init(&mut self, config: &EngineConfig) -> io::Result<()>;

    /// Submit one operation
    fn submit(&mut self, op: IOOperation<'_>) -> io::Result<()>;

    /// Collect finished operations (may be empty)
    fn poll_completions(&mut self) -> io::Result<Vec<IOCompletion>>;

    /// Release engine resources; the engine is unusable afterwards
    fn cleanup(&mut self) -> io::Result<()>;

    fn capabilities(&self) -> EngineCapabilities;
}

/// Builds a fresh engine per worker / run
pub type EngineFactory = Arc<dyn Fn() -> Box<dyn IOEngine> + Send + Sync>;

/// Factory producing [`sync::SyncEngine`] instances
pub fn sync_engine_factory() -> EngineFactory {
    Arc::new(|| Box::new(sync::SyncEngine::new()) as Box<dyn IOEngine>)
}

/// Submit `op` and wait for its completion, returning the bytes transferred
pub fn complete_one(engine: &mut dyn IOEngine, op: IOOperation<'_>) -> io::Result<usize> {
    let user_data = op.user_data;
    engine.submit(op)?;

    loop {
        let completions = engine.poll_completions()?;
        if completions.is_empty() {
            std::thread::yield_now();
            continue;
        }
        for completion in completions {
            if completion.user_data == user_data {
                return completion.result;
            }
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Operations the caller may keep in flight on this engine
    pub queue_depth: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { queue_depth: 1 }
    }
}

/// A single positioned IO request
#[derive(Debug)]
pub struct IOOperation<'a> {
    pub op_type: OperationType,
    pub target_fd: RawFd,
    /// Byte offset in the file (ignored for fsync)
    pub offset: u64,
    /// Data source for writes, destination for reads, empty for fsync
    pub buffer: &'a mut [u8],
    /// Caller-chosen tag echoed back in the completion
    pub user_data: u64,
}

impl<'a> IOOperation<'a> {
    pub fn new(op_type: OperationType, target_fd: RawFd, offset: u64, buffer: &'a mut [u8]) -> Self {
        Self {
            op_type,
            target_fd,
            offset,
            buffer,
            user_data: 0,
        }
    }

    /// Flush request for `target_fd`
    pub fn fsync(target_fd: RawFd) -> IOOperation<'static> {
        IOOperation {
            op_type: OperationType::Fsync,
            target_fd,
            offset: 0,
            buffer: Default::default(),
            user_data: 0,
        }
    }

    pub fn with_user_data(mut self, user_data: u64) -> Self {
        self.user_data = user_data;
        self
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

/// Type of IO operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationType {
    Read,
    Write,
    /// Flush file data and metadata to stable storage
    Fsync,
}

impl OperationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationType::Read => "read",
            OperationType::Write => "write",
            OperationType::Fsync => "fsync",
        }
    }
}

/// Completed IO operation
#[derive(Debug)]
pub struct IOCompletion {
    pub user_data: u64,
    /// Bytes transferred (0 for fsync), or the error that ended the operation
    pub result: io::Result<usize>,
    pub op_type: OperationType,
}

/// Engine capabilities
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineCapabilities {
    /// Multiple operations may be in flight at once
    pub async_io: bool,
    /// Fsync reaches stable storage (false for engines that never touch disk)
    pub durable_flush: bool,
    /// Maximum operations outstanding on one engine
    pub max_queue_depth: usize,
}

impl Default for EngineCapabilities {
    fn default() -> Self {
        Self {
            async_io: false,
            durable_flush: true,
            max_queue_depth: 1,
        }
    }
}
