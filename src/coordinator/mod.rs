//! Run orchestration
//!
//! [`RunOrchestrator`] sequences a whole session: it prepares the test
//! directory, starts the resource sampler, executes every configured test type
//! for the configured number of iterations and hands back the results in run
//! id order.
//!
//! Run ids start at 1 and increase by one per measured run across the whole
//! session, regardless of test type. Warmup passes use scratch files and
//! consume no run id; their results are logged and dropped.
//!
//! Any run failure aborts the session. The sampler is stopped and data files
//! are cleaned up either way; results gathered before the failure are not
//! returned.

use crate::config::{BenchmarkConfig, TestType};
use crate::engine::EngineFactory;
use crate::monitor::proc::ProcMetricsSource;
use crate::monitor::{MetricsSnapshot, MetricsSource, ResourceSampler};
use crate::stats::BenchmarkResult;
use crate::target::BenchmarkPaths;
use crate::worker::WorkloadExecutor;
use crate::Result;
use std::fs;
use std::path::Path;
use std::sync::Arc;

pub struct RunOrchestrator {
    config: Arc<BenchmarkConfig>,
    paths: BenchmarkPaths,
    executor: WorkloadExecutor,
    sampler: Option<ResourceSampler>,
}

impl RunOrchestrator {
    /// Orchestrator with on-disk paths, the sync engine and /proc metrics
    pub fn new(config: Arc<BenchmarkConfig>) -> Self {
        let paths = BenchmarkPaths::new(config.test_directory(), config.session_id());
        let executor = WorkloadExecutor::new(Arc::clone(&config));
        let sampler = config
            .collect_system_metrics()
            .then(|| ResourceSampler::new(Box::new(ProcMetricsSource::new())));

        Self {
            config,
            paths,
            executor,
            sampler,
        }
    }

    pub fn with_paths(mut self, paths: BenchmarkPaths) -> Self {
        self.paths = paths;
        self
    }

    pub fn with_engine_factory(mut self, factory: EngineFactory) -> Self {
        self.executor = WorkloadExecutor::new(Arc::clone(&self.config)).with_engine_factory(factory);
        self
    }

    /// Replace the metrics source; ignored when metrics collection is off
    pub fn with_metrics_source(mut self, source: Box<dyn MetricsSource>) -> Self {
        if self.config.collect_system_metrics() {
            self.sampler = Some(ResourceSampler::new(source));
        }
        self
    }

    pub fn config(&self) -> &BenchmarkConfig {
        &self.config
    }

    pub fn paths(&self) -> &BenchmarkPaths {
        &self.paths
    }

    /// Session banner: id, directory and current time
    pub fn header(&self) -> String {
        self.paths.header()
    }

    /// Snapshots captured by the sampler so far (empty when metrics are off)
    pub fn snapshots(&self) -> Vec<MetricsSnapshot> {
        self.sampler.as_ref().map(ResourceSampler::snapshots).unwrap_or_default()
    }

    /// Execute every configured run and return the results in run id order
    ///
    /// # Errors
    ///
    /// - [`crate::Error::DirectoryUnusable`] / [`crate::Error::InsufficientSpace`]
    ///   before any run starts
    /// - [`crate::Error::RunIo`] / [`crate::Error::DegenerateTiming`] from the
    ///   first failing run; the remaining runs are skipped
    pub fn run_all(&mut self) -> Result<Vec<BenchmarkResult>> {
        self.paths.ensure_test_directory()?;
        self.paths.validate_free_space(self.config.file_size_bytes())?;

        tracing::info!(
            session = self.config.session_id(),
            test_types = self.config.test_types().len(),
            iterations = self.config.iterations(),
            warmups = self.config.warmup_iterations(),
            total_runs = self.config.total_runs(),
            "starting benchmark session"
        );

        if let Some(sampler) = self.sampler.as_mut() {
            sampler.start(self.config.metrics_poll_interval())?;
        }

        let outcome = self.run_sequence();

        if let Some(sampler) = self.sampler.as_mut() {
            sampler.stop();
        }
        let removed = self.paths.cleanup_session_files(self.config.retain_test_files());

        match &outcome {
            Ok(results) => tracing::info!(runs = results.len(), removed, "benchmark session finished"),
            Err(e) => tracing::warn!(error = %e, removed, "benchmark session aborted"),
        }
        outcome
    }

    fn run_sequence(&self) -> Result<Vec<BenchmarkResult>> {
        let mut results = Vec::with_capacity(self.config.total_runs() as usize);
        let mut next_run_id: u32 = 1;

        for &test_type in self.config.test_types() {
            for n in 1..=self.config.warmup_iterations() {
                self.warmup(test_type, n)?;
            }

            for _ in 0..self.config.iterations() {
                let run_id = next_run_id;
                next_run_id += 1;

                let path = self.paths.test_file_path(run_id, test_type.descriptor());
                let result = self.executor.execute(run_id, test_type, &path)?;
                tracing::info!(
                    run_id,
                    test_type = %test_type,
                    throughput_mbps = result.throughput_mbps,
                    iops = result.iops,
                    "run complete"
                );

                if !self.config.retain_test_files() {
                    remove_quietly(&path);
                }
                results.push(result);
            }
        }

        Ok(results)
    }

    fn warmup(&self, test_type: TestType, n: u32) -> Result<()> {
        let path = self
            .paths
            .temp_file_path(0, &format!("warmup {} {}", test_type.descriptor(), n));
        let outcome = self.executor.execute(0, test_type, &path);
        remove_quietly(&path);

        let warm = outcome?;
        tracing::debug!(
            test_type = %test_type,
            warmup = n,
            throughput_mbps = warm.throughput_mbps,
            "warmup discarded"
        );
        Ok(())
    }
}

/// Delete a run file, logging instead of failing
fn remove_quietly(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(path = %path.display(), error = %e, "failed to delete test file");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GIB, MIB};
    use crate::engine::mock::MockEngine;
    use crate::engine::{IOEngine, OperationType};
    use crate::error::Error;
    use crate::monitor::synthetic::SyntheticMetricsSource;
    use std::time::Duration;
    use tempfile::TempDir;

    const PLENTY: u64 = 1 << 40;
    const BLOCKS: usize = (GIB / MIB) as usize;

    struct Harness {
        dir: TempDir,
        engine: MockEngine,
    }

    impl Harness {
        fn new() -> Self {
            let engine = MockEngine::new();
            engine.set_cleanup_delay(Duration::from_millis(2));
            Self {
                dir: TempDir::new().unwrap(),
                engine,
            }
        }

        fn builder(&self) -> crate::config::BenchmarkConfigBuilder {
            BenchmarkConfig::builder()
                .test_directory(self.dir.path().join("bench"))
                .file_size_bytes(GIB)
                .block_size_bytes(MIB)
                .warmup_iterations(0)
                .collect_system_metrics(false)
        }

        fn orchestrator(&self, config: BenchmarkConfig, free: u64) -> RunOrchestrator {
            let config = Arc::new(config);
            let paths = BenchmarkPaths::new(config.test_directory(), config.session_id())
                .with_free_space(move |_| Ok(free));
            let engine = self.engine.clone();
            RunOrchestrator::new(config)
                .with_paths(paths)
                .with_engine_factory(Arc::new(move || Box::new(engine.clone()) as Box<dyn IOEngine>))
        }
    }

    #[test]
    fn test_run_ids_are_sequential_and_grouped() {
        let h = Harness::new();
        let config = h
            .builder()
            .test_types([TestType::SeqWrite, TestType::RandRead])
            .iterations(3)
            .build()
            .unwrap();

        let results = h.orchestrator(config, PLENTY).run_all().unwrap();

        let ids: Vec<u32> = results.iter().map(|r| r.run_id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5, 6]);
        let types: Vec<TestType> = results.iter().map(|r| r.test_type).collect();
        assert_eq!(
            types,
            vec![
                TestType::SeqWrite,
                TestType::SeqWrite,
                TestType::SeqWrite,
                TestType::RandRead,
                TestType::RandRead,
                TestType::RandRead
            ]
        );
        // One fsync per write run and one per read file fill
        assert_eq!(h.engine.count_of(OperationType::Fsync), 6);
    }

    #[test]
    fn test_warmups_consume_no_run_ids() {
        let h = Harness::new();
        let config = h
            .builder()
            .test_types([TestType::SeqRead])
            .iterations(3)
            .warmup_iterations(2)
            .build()
            .unwrap();

        let results = h.orchestrator(config, PLENTY).run_all().unwrap();

        assert_eq!(results.iter().map(|r| r.run_id).collect::<Vec<_>>(), vec![1, 2, 3]);
        // 2 warmups + 3 measured runs, 1024 blocks each
        assert_eq!(h.engine.count_of(OperationType::Read), 5 * BLOCKS);
    }

    #[test]
    fn test_run_failure_aborts_session() {
        let h = Harness::new();
        // Each read run is a fill (BLOCKS writes + fsync) then BLOCKS reads,
        // so index 3 * BLOCKS + 7 is the sixth read of run 2
        h.engine.fail_after(3 * BLOCKS + 7);
        let config = h
            .builder()
            .test_types([TestType::SeqRead, TestType::SeqWrite])
            .iterations(3)
            .build()
            .unwrap();

        let err = h.orchestrator(config, PLENTY).run_all().unwrap_err();

        match err {
            Error::RunIo { run_id, test_type, op, .. } => {
                assert_eq!(run_id, 2);
                assert_eq!(test_type, TestType::SeqRead);
                assert_eq!(op, "read");
            }
            other => panic!("unexpected error: {other}"),
        }
        // Nothing after the failing read was attempted
        assert_eq!(h.engine.submitted_count(), 3 * BLOCKS + 8);
    }

    #[test]
    fn test_directory_that_is_a_file_fails_before_runs() {
        let h = Harness::new();
        let file = h.dir.path().join("bench");
        fs::write(&file, b"occupied").unwrap();
        let config = h.builder().build().unwrap();

        let err = h.orchestrator(config, PLENTY).run_all().unwrap_err();

        assert!(matches!(err, Error::DirectoryUnusable { .. }));
        assert_eq!(h.engine.submitted_count(), 0);
    }

    #[test]
    fn test_insufficient_space_fails_before_runs() {
        let h = Harness::new();
        let config = h.builder().build().unwrap();

        // 1 GiB file needs 1.05 GiB free
        let err = h.orchestrator(config, GIB + MIB).run_all().unwrap_err();

        match err {
            Error::InsufficientSpace { required, available, .. } => {
                assert_eq!(required, (GIB * 21).div_ceil(20));
                assert_eq!(available, GIB + MIB);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(h.engine.submitted_count(), 0);
    }

    #[test]
    fn test_data_files_removed_unless_retained() {
        let h = Harness::new();
        let config = h.builder().test_types([TestType::SeqWrite]).iterations(3).build().unwrap();
        let mut orchestrator = h.orchestrator(config, PLENTY);
        orchestrator.run_all().unwrap();
        let leftover = fs::read_dir(orchestrator.paths().base_dir()).unwrap().count();
        assert_eq!(leftover, 0);

        let config = h
            .builder()
            .test_types([TestType::SeqWrite])
            .iterations(3)
            .retain_test_files(true)
            .build()
            .unwrap();
        let mut orchestrator = h.orchestrator(config, PLENTY);
        orchestrator.run_all().unwrap();
        assert!(orchestrator.paths().test_file_path(1, "seq_write").exists());
        assert!(orchestrator.paths().test_file_path(3, "seq_write").exists());
    }

    #[test]
    fn test_sampler_runs_for_the_session() {
        let h = Harness::new();
        let config = h
            .builder()
            .test_types([TestType::SeqWrite])
            .iterations(3)
            .collect_system_metrics(true)
            .metrics_poll_interval(Duration::from_millis(100))
            .build()
            .unwrap();

        let mut orchestrator = h
            .orchestrator(config, PLENTY)
            .with_metrics_source(Box::new(SyntheticMetricsSource::with_seed(3)));
        orchestrator.run_all().unwrap();

        let snapshots = orchestrator.snapshots();
        assert!(!snapshots.is_empty());
        assert!(snapshots.iter().all(|s| s.cpu_percent <= 50.0));
    }

    #[test]
    fn test_metrics_source_ignored_when_disabled() {
        let h = Harness::new();
        let config = h.builder().test_types([TestType::SeqRead]).iterations(3).build().unwrap();

        let mut orchestrator = h
            .orchestrator(config, PLENTY)
            .with_metrics_source(Box::new(SyntheticMetricsSource::new()));
        orchestrator.run_all().unwrap();
        assert!(orchestrator.snapshots().is_empty());
    }
}
