//! System resource sampling
//!
//! A [`ResourceSampler`] captures [`MetricsSnapshot`]s on a background thread
//! at a fixed cadence, independently of run boundaries. Where the numbers come
//! from is behind the [`MetricsSource`] trait:
//!
//! - [`proc::ProcMetricsSource`]: Linux `/proc` and `/sys` counters
//! - [`synthetic::SyntheticMetricsSource`]: placeholder random values
//!
//! Snapshots are appended under a mutex from the sampler thread and read by
//! the orchestrator after `stop()`. Stopping joins the thread and never drops
//! snapshots that were already captured.
//!
//! # Example
//!
//! ```no_run
//! use storemark::monitor::{ResourceSampler, synthetic::SyntheticMetricsSource};
//! use std::time::Duration;
//!
//! let mut sampler = ResourceSampler::new(Box::new(SyntheticMetricsSource::new()));
//! sampler.start(Duration::from_millis(500))?;
//! // ... run benchmarks ...
//! sampler.stop();
//! println!("{} snapshots", sampler.snapshots().len());
//! # Ok::<(), storemark::Error>(())
//! ```

pub mod proc;
pub mod synthetic;

use crate::error::Error;
use crate::Result;
use chrono::{DateTime, Utc};
use crossbeam::channel::{self, Sender};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;
use std::time::Duration;

/// System utilization at one point in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub timestamp: DateTime<Utc>,
    /// 0-100
    pub cpu_percent: f64,
    /// 0-100
    pub ram_percent: f64,
    /// 0-100
    pub disk_percent: f64,
    pub disk_temperature_c: Option<f64>,
}

impl MetricsSnapshot {
    /// Build a snapshot stamped now, clamping percentages into 0-100
    pub fn now(cpu_percent: f64, ram_percent: f64, disk_percent: f64, disk_temperature_c: Option<f64>) -> Self {
        Self {
            timestamp: Utc::now(),
            cpu_percent: clamp_percent(cpu_percent),
            ram_percent: clamp_percent(ram_percent),
            disk_percent: clamp_percent(disk_percent),
            disk_temperature_c,
        }
    }
}

fn clamp_percent(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 100.0)
    }
}

/// Pluggable producer of snapshots
pub trait MetricsSource: Send {
    fn sample(&mut self) -> MetricsSnapshot;

    /// Short name for logs
    fn name(&self) -> &'static str;
}

/// Background sampler with start / stop / snapshots lifecycle
pub struct ResourceSampler {
    source: Option<Box<dyn MetricsSource>>,
    snapshots: Arc<Mutex<Vec<MetricsSnapshot>>>,
    stop_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<Box<dyn MetricsSource>>>,
}

impl ResourceSampler {
    pub fn new(source: Box<dyn MetricsSource>) -> Self {
        Self {
            source: Some(source),
            snapshots: Arc::new(Mutex::new(Vec::new())),
            stop_tx: None,
            handle: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// Start sampling every `interval`; the first snapshot is taken immediately
    ///
    /// Starting a running sampler does nothing.
    pub fn start(&mut self, interval: Duration) -> Result<()> {
        if self.is_running() {
            return Ok(());
        }

        let mut source = self.source.take().ok_or_else(|| {
            Error::io(
                "starting resource sampler",
                std::io::Error::new(std::io::ErrorKind::Other, "metrics source was lost"),
            )
        })?;
        let snapshots = Arc::clone(&self.snapshots);
        let (stop_tx, stop_rx) = channel::bounded::<()>(1);
        let source_name = source.name();

        let handle = std::thread::Builder::new()
            .name("storemark-sampler".to_string())
            .spawn(move || {
                let ticker = channel::tick(interval);
                loop {
                    let snapshot = source.sample();
                    lock(&snapshots).push(snapshot);

                    crossbeam::select! {
                        recv(stop_rx) -> _ => break,
                        recv(ticker) -> _ => {}
                    }
                }
                source
            })
            .map_err(|e| Error::io("spawning resource sampler thread", e))?;

        tracing::debug!(source = source_name, interval_ms = interval.as_millis() as u64, "sampler started");
        self.stop_tx = Some(stop_tx);
        self.handle = Some(handle);
        Ok(())
    }

    /// Stop sampling and wait for the thread; captured snapshots are kept
    pub fn stop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            // Disconnecting also wakes the thread if the send races with exit
            let _ = tx.send(());
        }

        if let Some(handle) = self.handle.take() {
            match handle.join() {
                Ok(source) => self.source = Some(source),
                Err(_) => tracing::warn!("resource sampler thread panicked"),
            }
            tracing::debug!(snapshots = self.len(), "sampler stopped");
        }
    }

    /// Copy of all snapshots captured so far, in capture order
    pub fn snapshots(&self) -> Vec<MetricsSnapshot> {
        lock(&self.snapshots).clone()
    }

    pub fn len(&self) -> usize {
        lock(&self.snapshots).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Drop for ResourceSampler {
    fn drop(&mut self) {
        self.stop();
    }
}

fn lock(snapshots: &Mutex<Vec<MetricsSnapshot>>) -> MutexGuard<'_, Vec<MetricsSnapshot>> {
    snapshots.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    struct CountingSource {
        calls: u32,
    }

    impl MetricsSource for CountingSource {
        fn sample(&mut self) -> MetricsSnapshot {
            self.calls += 1;
            MetricsSnapshot::now(self.calls as f64, 0.0, 0.0, None)
        }

        fn name(&self) -> &'static str {
            "counting"
        }
    }

    #[test]
    fn test_sampler_collects_until_stopped() {
        let mut sampler = ResourceSampler::new(Box::new(CountingSource { calls: 0 }));
        sampler.start(Duration::from_millis(10)).unwrap();
        assert!(sampler.is_running());
        std::thread::sleep(Duration::from_millis(80));
        sampler.stop();
        assert!(!sampler.is_running());

        let snapshots = sampler.snapshots();
        assert!(snapshots.len() >= 2, "got {}", snapshots.len());
        for (i, s) in snapshots.iter().enumerate() {
            assert_eq!(s.cpu_percent, (i + 1) as f64);
        }
        for pair in snapshots.windows(2) {
            assert!(pair[0].timestamp <= pair[1].timestamp);
        }

        let count = snapshots.len();
        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(sampler.len(), count);
    }

    #[test]
    fn test_first_snapshot_is_immediate_and_stop_is_prompt() {
        let mut sampler = ResourceSampler::new(Box::new(CountingSource { calls: 0 }));
        sampler.start(Duration::from_secs(5)).unwrap();

        let start = Instant::now();
        while sampler.is_empty() && start.elapsed() < Duration::from_secs(2) {
            std::thread::sleep(Duration::from_millis(1));
        }
        sampler.stop();

        assert_eq!(sampler.len(), 1);
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn test_sampler_restarts_and_appends() {
        let mut sampler = ResourceSampler::new(Box::new(CountingSource { calls: 0 }));
        sampler.start(Duration::from_secs(5)).unwrap();
        sampler.start(Duration::from_secs(5)).unwrap();
        std::thread::sleep(Duration::from_millis(20));
        sampler.stop();
        let first = sampler.len();

        sampler.start(Duration::from_secs(5)).unwrap();
        std::thread::sleep(Duration::from_millis(20));
        sampler.stop();
        assert_eq!(sampler.len(), first + 1);
    }

    #[test]
    fn test_stop_without_start_is_noop() {
        let mut sampler = ResourceSampler::new(Box::new(CountingSource { calls: 0 }));
        sampler.stop();
        assert!(sampler.is_empty());
    }

    #[test]
    fn test_snapshot_clamps_percentages() {
        let s = MetricsSnapshot::now(150.0, -3.0, f64::NAN, Some(41.0));
        assert_eq!(s.cpu_percent, 100.0);
        assert_eq!(s.ram_percent, 0.0);
        assert_eq!(s.disk_percent, 0.0);
        assert_eq!(s.disk_temperature_c, Some(41.0));
    }
}
