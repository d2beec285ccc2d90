//! Workload execution
//!
//! The [`WorkloadExecutor`] performs one timed pass of a test type against a
//! dedicated file and turns the wall-clock time into a [`BenchmarkResult`].
//!
//! # Read file preparation
//!
//! Read runs first write the whole file sequentially through a fresh engine,
//! fsync it and drop it from the page cache. This happens before the clock
//! starts, so reads hit allocated blocks on the device instead of sparse
//! holes and are not counted against the run.
//!
//! # Timed region
//!
//! The clock starts before the file is opened and stops after it is closed,
//! so it covers:
//!
//! 1. Opening (creating and sizing) the test file
//! 2. The block loop ([`stream::BlockStream`])
//! 3. `fsync` for write workloads
//! 4. Engine cleanup and file close
//!
//! # IO modes
//!
//! - **Sync**: one block stream over the whole file on the calling thread
//! - **Async**: the file is split into chunks and driven by a bounded worker
//!   pool ([`pool`]); elapsed time is the span of the whole batch
//!
//! Any I/O failure ends the run immediately and is not retried.

pub mod pool;
pub mod stream;

use crate::config::{BenchmarkConfig, IoMode, TestType};
use crate::engine::{complete_one, sync_engine_factory, EngineConfig, EngineFactory, IOOperation};
use crate::error::Error;
use crate::stats::{BenchmarkResult, RunMetrics};
use crate::target::TestFile;
use crate::Result;
use chrono::Utc;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use stream::{BlockStream, StreamError, StreamResult, StreamTotals};

/// Parameters of a single run, derived from the session configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunPlan {
    pub test_type: TestType,
    pub file_size_bytes: u64,
    pub block_size: usize,
    pub threads: usize,
    pub queue_depth: usize,
    pub io_mode: IoMode,
    pub seed: Option<u64>,
}

impl RunPlan {
    pub fn from_config(config: &BenchmarkConfig, test_type: TestType) -> Self {
        Self {
            test_type,
            file_size_bytes: config.file_size_bytes(),
            block_size: config.block_size_bytes() as usize,
            threads: config.threads(),
            queue_depth: config.queue_depth(),
            io_mode: config.io_mode(),
            seed: config.random_seed(),
        }
    }
}

/// Runs single timed passes; one instance serves a whole session
pub struct WorkloadExecutor {
    config: Arc<BenchmarkConfig>,
    engine_factory: EngineFactory,
}

impl WorkloadExecutor {
    pub fn new(config: Arc<BenchmarkConfig>) -> Self {
        Self {
            config,
            engine_factory: sync_engine_factory(),
        }
    }

    /// Use a different engine for every run (tests use the mock engine)
    pub fn with_engine_factory(mut self, factory: EngineFactory) -> Self {
        self.engine_factory = factory;
        self
    }

    pub fn config(&self) -> &BenchmarkConfig {
        &self.config
    }

    /// Execute one timed pass of `test_type` against `path`
    ///
    /// # Errors
    ///
    /// - [`Error::RunIo`] if preparing the read file, opening, any
    ///   read/write, the flush or close fails
    /// - [`Error::DegenerateTiming`] if the run took under a millisecond or
    ///   performed no operations
    pub fn execute(&self, run_id: u32, test_type: TestType, path: &Path) -> Result<BenchmarkResult> {
        let plan = RunPlan::from_config(&self.config, test_type);
        self.execute_plan(run_id, &plan, path)
    }

    /// Execute an explicit plan; `execute` derives the plan from the config
    pub fn execute_plan(&self, run_id: u32, plan: &RunPlan, path: &Path) -> Result<BenchmarkResult> {
        tracing::debug!(
            run_id,
            test_type = %plan.test_type,
            mode = %plan.io_mode,
            path = %path.display(),
            "starting run"
        );

        if !plan.test_type.is_write() {
            self.prepare_read_file(plan, path).map_err(|e| Error::RunIo {
                run_id,
                test_type: plan.test_type,
                op: "prepare",
                source: e.source,
            })?;
        }

        let start = Instant::now();
        let totals = self.timed_pass(plan, path).map_err(|e| Error::RunIo {
            run_id,
            test_type: plan.test_type,
            op: e.op,
            source: e.source,
        })?;
        let elapsed = start.elapsed();

        let metrics = RunMetrics::compute(plan.file_size_bytes, totals.ops, elapsed).ok_or(
            Error::DegenerateTiming {
                run_id,
                test_type: plan.test_type,
                ops: totals.ops,
                elapsed,
            },
        )?;

        let result = BenchmarkResult {
            run_id,
            test_type: plan.test_type,
            bytes_processed: totals.bytes,
            elapsed,
            throughput_mbps: metrics.throughput_mbps,
            avg_latency_ms: metrics.avg_latency_ms,
            iops: metrics.iops,
            timestamp: Utc::now(),
        };

        tracing::debug!(
            run_id,
            test_type = %plan.test_type,
            bytes = result.bytes_processed,
            ops = totals.ops,
            elapsed_ms = result.elapsed_ms() as u64,
            throughput_mbps = result.throughput_mbps,
            "run finished"
        );

        if elapsed > self.config.max_per_test_target() {
            tracing::warn!(
                run_id,
                test_type = %plan.test_type,
                elapsed_s = elapsed.as_secs_f64(),
                target_s = self.config.max_per_test_target().as_secs_f64(),
                "run exceeded the per-test time target"
            );
        }

        Ok(result)
    }

    /// Write every block of the file, flush it and evict it from the cache
    fn prepare_read_file(&self, plan: &RunPlan, path: &Path) -> StreamResult<()> {
        let file = TestFile::open(path, plan.file_size_bytes).map_err(StreamError::at("open"))?;

        let mut engine = (self.engine_factory)();
        engine
            .init(&EngineConfig { queue_depth: 1 })
            .map_err(StreamError::at("init"))?;
        let mut fill = BlockStream::new(TestType::SeqWrite, 0..plan.file_size_bytes, plan.block_size, plan.seed);
        let totals = fill.drive(engine.as_mut(), file.fd())?;
        complete_one(engine.as_mut(), IOOperation::fsync(file.fd())).map_err(StreamError::at("fsync"))?;
        engine.cleanup().map_err(StreamError::at("cleanup"))?;

        if let Err(e) = file.drop_cache() {
            tracing::warn!(path = %path.display(), error = %e, "could not drop cached pages before read run");
        }
        tracing::debug!(path = %path.display(), bytes = totals.bytes, "read file prepared");

        file.close().map_err(StreamError::at("close"))
    }

    fn timed_pass(&self, plan: &RunPlan, path: &Path) -> StreamResult<StreamTotals> {
        let file = TestFile::open(path, plan.file_size_bytes).map_err(StreamError::at("open"))?;

        let totals = match plan.io_mode {
            IoMode::Sync => self.single_stream(plan, &file)?,
            IoMode::Async => {
                let totals = pool::run_parallel(plan, file.fd(), &self.engine_factory)?;
                if plan.test_type.is_write() {
                    self.flush_parallel(&file)?;
                }
                totals
            }
        };

        file.close().map_err(StreamError::at("close"))?;
        Ok(totals)
    }

    fn single_stream(&self, plan: &RunPlan, file: &TestFile) -> StreamResult<StreamTotals> {
        let mut engine = (self.engine_factory)();
        engine
            .init(&EngineConfig { queue_depth: 1 })
            .map_err(StreamError::at("init"))?;

        let mut stream = BlockStream::new(plan.test_type, 0..plan.file_size_bytes, plan.block_size, plan.seed);
        let totals = stream.drive(engine.as_mut(), file.fd())?;

        if plan.test_type.is_write() {
            complete_one(engine.as_mut(), IOOperation::fsync(file.fd())).map_err(StreamError::at("fsync"))?;
        }

        engine.cleanup().map_err(StreamError::at("cleanup"))?;
        Ok(totals)
    }

    /// Flush after a parallel write batch; workers never fsync themselves
    fn flush_parallel(&self, file: &TestFile) -> StreamResult<()> {
        let mut engine = (self.engine_factory)();
        engine
            .init(&EngineConfig { queue_depth: 1 })
            .map_err(StreamError::at("init"))?;
        complete_one(engine.as_mut(), IOOperation::fsync(file.fd())).map_err(StreamError::at("fsync"))?;
        engine.cleanup().map_err(StreamError::at("cleanup"))
    }
}
