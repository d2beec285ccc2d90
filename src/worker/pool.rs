//! Bounded worker pool for parallel runs
//!
//! The file is split into block-aligned chunks. A fixed set of worker threads,
//! each with its own engine, pulls chunks from a bounded crossbeam channel
//! whose capacity is the configured queue depth, and drives one
//! [`BlockStream`] per chunk against the shared descriptor (pread/pwrite do
//! not share a file cursor, so no locking is needed).
//!
//! Chunk `i` is seeded with `seed + i`, which keeps offsets and payloads
//! reproducible no matter which worker picks the chunk up.
//!
//! The first failing worker raises an abort flag; the others stop after their
//! current chunk and the first error is returned.

use super::stream::{BlockStream, StreamError, StreamResult, StreamTotals};
use super::RunPlan;
use crate::engine::{EngineConfig, EngineFactory};
use crossbeam::channel::{self, Receiver};
use std::io;
use std::ops::Range;
use std::os::unix::io::RawFd;
use std::sync::atomic::{AtomicBool, Ordering};

/// Chunks queued per worker when splitting a file
pub const CHUNKS_PER_WORKER: u64 = 8;

/// One unit of work for the pool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkChunk {
    pub index: u64,
    pub range: Range<u64>,
}

/// Split `0..file_size` into block-aligned chunks for `threads` workers
pub fn split_chunks(file_size: u64, block_size: u64, threads: usize) -> Vec<WorkChunk> {
    let target = file_size.div_ceil(threads.max(1) as u64 * CHUNKS_PER_WORKER);
    let chunk_size = target.div_ceil(block_size).max(1) * block_size;

    let mut chunks = Vec::new();
    let mut start = 0;
    while start < file_size {
        let end = (start + chunk_size).min(file_size);
        chunks.push(WorkChunk {
            index: chunks.len() as u64,
            range: start..end,
        });
        start = end;
    }
    chunks
}

/// Drive every chunk of `plan` across the pool and sum the totals
pub fn run_parallel(plan: &RunPlan, fd: RawFd, factory: &EngineFactory) -> StreamResult<StreamTotals> {
    let chunks = split_chunks(plan.file_size_bytes, plan.block_size as u64, plan.threads);
    let (tx, rx) = channel::bounded::<WorkChunk>(plan.queue_depth.max(1));
    let abort = AtomicBool::new(false);

    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..plan.threads)
            .map(|worker_id| {
                let rx = rx.clone();
                let abort = &abort;
                scope.spawn(move || worker_loop(worker_id, plan, fd, factory, rx, abort))
            })
            .collect();
        drop(rx);

        for chunk in chunks {
            if abort.load(Ordering::Relaxed) || tx.send(chunk).is_err() {
                break;
            }
        }
        drop(tx);

        let mut totals = StreamTotals::default();
        let mut first_error: Option<StreamError> = None;
        for handle in handles {
            match handle.join() {
                Ok(Ok(worker_totals)) => totals += worker_totals,
                Ok(Err(e)) => {
                    first_error.get_or_insert(e);
                }
                Err(_) => {
                    first_error.get_or_insert(StreamError::new(
                        "worker",
                        io::Error::new(io::ErrorKind::Other, "worker thread panicked"),
                    ));
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(totals),
        }
    })
}

fn worker_loop(
    worker_id: usize,
    plan: &RunPlan,
    fd: RawFd,
    factory: &EngineFactory,
    chunks: Receiver<WorkChunk>,
    abort: &AtomicBool,
) -> StreamResult<StreamTotals> {
    let mut engine = factory();
    let result = (|| -> StreamResult<StreamTotals> {
        engine
            .init(&EngineConfig { queue_depth: 1 })
            .map_err(StreamError::at("init"))?;

        let mut totals = StreamTotals::default();
        for chunk in chunks.iter() {
            if abort.load(Ordering::Relaxed) {
                break;
            }
            let seed = plan.seed.map(|s| s.wrapping_add(chunk.index));
            let mut stream = BlockStream::new(plan.test_type, chunk.range, plan.block_size, seed);
            totals += stream.drive(engine.as_mut(), fd)?;
        }

        engine.cleanup().map_err(StreamError::at("cleanup"))?;
        Ok(totals)
    })();

    if let Err(e) = &result {
        abort.store(true, Ordering::Relaxed);
        tracing::debug!(worker_id, op = e.op, error = %e.source, "worker failed");
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{IoMode, TestType};
    use crate::engine::mock::MockEngine;
    use crate::engine::IOEngine;
    use std::collections::HashSet;
    use std::sync::Arc;

    fn plan(test_type: TestType, file_size: u64, block: usize, threads: usize, depth: usize) -> RunPlan {
        RunPlan {
            test_type,
            file_size_bytes: file_size,
            block_size: block,
            threads,
            queue_depth: depth,
            io_mode: IoMode::Async,
            seed: Some(11),
        }
    }

    fn mock_factory(engine: &MockEngine) -> EngineFactory {
        let engine = engine.clone();
        Arc::new(move || Box::new(engine.clone()) as Box<dyn IOEngine>)
    }

    #[test]
    fn test_split_chunks_cover_file() {
        let chunks = split_chunks(1_000_000, 4096, 3);
        assert_eq!(chunks.first().unwrap().range.start, 0);
        assert_eq!(chunks.last().unwrap().range.end, 1_000_000);
        for pair in chunks.windows(2) {
            assert_eq!(pair[0].range.end, pair[1].range.start);
            assert_eq!(pair[0].range.start % 4096, 0);
        }
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.index, i as u64);
        }
        assert!(chunks.len() as u64 <= 3 * CHUNKS_PER_WORKER);
    }

    #[test]
    fn test_split_chunks_small_file() {
        let chunks = split_chunks(4096, 4096, 32);
        assert_eq!(chunks, vec![WorkChunk { index: 0, range: 0..4096 }]);
    }

    #[test]
    fn test_parallel_sequential_covers_every_block_once() {
        let engine = MockEngine::new();
        let plan = plan(TestType::SeqWrite, 4 * 1024 * 1024, 4096, 4, 8);

        let totals = run_parallel(&plan, 3, &mock_factory(&engine)).unwrap();
        assert_eq!(totals, StreamTotals { bytes: 4 * 1024 * 1024, ops: 1024 });

        let offsets: HashSet<u64> = engine.data_offsets().into_iter().collect();
        assert_eq!(offsets.len(), 1024);
        assert!(offsets.iter().all(|o| o % 4096 == 0 && *o < 4 * 1024 * 1024));
        assert_eq!(engine.cleanup_count(), 4);
    }

    #[test]
    fn test_parallel_random_is_reproducible() {
        let run = || {
            let engine = MockEngine::new();
            let plan = plan(TestType::RandRead, 2 * 1024 * 1024, 4096, 3, 2);
            run_parallel(&plan, 3, &mock_factory(&engine)).unwrap();
            let mut offsets = engine.data_offsets();
            offsets.sort_unstable();
            offsets
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_parallel_failure_propagates() {
        let engine = MockEngine::new();
        engine.fail_after(10);
        let plan = plan(TestType::SeqRead, 4 * 1024 * 1024, 4096, 2, 4);

        let err = run_parallel(&plan, 3, &mock_factory(&engine)).unwrap_err();
        assert_eq!(err.op, "read");
        assert!(engine.submitted_count() < 1024);
    }
}
