//! Mock IO engine for testing
//!
//! Records every submitted operation without touching the file and completes
//! it with the requested length. Clones share the record log and failure
//! settings, so a test can keep one handle for inspection while executors and
//! workers own others. Pending completions stay private to each clone.
//!
//! Failure injection: `set_should_fail` fails every operation, `fail_after`
//! fails the n-th and later operations. `set_cleanup_delay` makes `cleanup()`
//! sleep, which gives timed runs a measurable elapsed time.

use super::{EngineCapabilities, EngineConfig, IOCompletion, IOEngine, IOOperation, OperationType};
use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Recorded operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationRecord {
    pub op_type: OperationType,
    pub target_fd: i32,
    pub offset: u64,
    pub length: usize,
    pub user_data: u64,
}

#[derive(Debug, Default)]
struct MockState {
    config: Option<EngineConfig>,
    submitted: Vec<OperationRecord>,
    should_fail: bool,
    fail_after: Option<usize>,
    cleanup_delay: Duration,
    cleanups: usize,
}

#[derive(Debug, Clone, Default)]
pub struct MockEngine {
    state: Arc<Mutex<MockState>>,
    /// Submitted but not yet polled, with their global submission index
    pending: VecDeque<(usize, OperationRecord)>,
}

impl MockEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        // A panicking test thread must not hide the records from the others
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn set_should_fail(&self, should_fail: bool) {
        self.state().should_fail = should_fail;
    }

    /// Fail the operation with zero-based index `n` and everything after it
    pub fn fail_after(&self, n: usize) {
        self.state().fail_after = Some(n);
    }

    pub fn set_cleanup_delay(&self, delay: Duration) {
        self.state().cleanup_delay = delay;
    }

    pub fn submitted_operations(&self) -> Vec<OperationRecord> {
        self.state().submitted.clone()
    }

    pub fn submitted_count(&self) -> usize {
        self.state().submitted.len()
    }

    /// Offsets of submitted reads and writes, in submission order
    pub fn data_offsets(&self) -> Vec<u64> {
        self.state()
            .submitted
            .iter()
            .filter(|r| r.op_type != OperationType::Fsync)
            .map(|r| r.offset)
            .collect()
    }

    pub fn count_of(&self, op_type: OperationType) -> usize {
        self.state().submitted.iter().filter(|r| r.op_type == op_type).count()
    }

    pub fn clear_submitted_operations(&self) {
        self.state().submitted.clear();
    }

    pub fn cleanup_count(&self) -> usize {
        self.state().cleanups
    }

    pub fn config(&self) -> Option<EngineConfig> {
        self.state().config.clone()
    }
}

impl IOEngine for MockEngine {
    fn init(&mut self, config: &EngineConfig) -> io::Result<()> {
        self.state().config = Some(config.clone());
        Ok(())
    }

    fn submit(&mut self, op: IOOperation<'_>) -> io::Result<()> {
        let record = OperationRecord {
            op_type: op.op_type,
            target_fd: op.target_fd,
            offset: op.offset,
            length: op.buffer.len(),
            user_data: op.user_data,
        };

        let index = {
            let mut state = self.state();
            state.submitted.push(record.clone());
            state.submitted.len() - 1
        };
        self.pending.push_back((index, record));
        Ok(())
    }

    fn poll_completions(&mut self) -> io::Result<Vec<IOCompletion>> {
        let (should_fail, fail_after) = {
            let state = self.state();
            (state.should_fail, state.fail_after)
        };

        let completions = self
            .pending
            .drain(..)
            .map(|(index, record)| {
                let failing = should_fail || fail_after.is_some_and(|n| index >= n);
                let result = if failing {
                    Err(io::Error::new(io::ErrorKind::Other, "mock IO error"))
                } else {
                    Ok(record.length)
                };
                IOCompletion {
                    user_data: record.user_data,
                    result,
                    op_type: record.op_type,
                }
            })
            .collect();

        Ok(completions)
    }

    fn cleanup(&mut self) -> io::Result<()> {
        self.pending.clear();
        let delay = {
            let mut state = self.state();
            state.cleanups += 1;
            state.cleanup_delay
        };
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
        Ok(())
    }

    fn capabilities(&self) -> EngineCapabilities {
        EngineCapabilities {
            durable_flush: false,
            ..EngineCapabilities::default()
        }
    }
}
