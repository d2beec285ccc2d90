//! Output formatting and reporting
//!
//! Report artifacts are written to the test directory as
//! `report.<session>.<ext>`, one per configured [`ReportFormat`]. The console
//! summary lives in [`text`].

pub mod csv;
pub mod html;
pub mod json;
pub mod text;

use crate::config::{BenchmarkConfig, ReportFormat};
use crate::monitor::MetricsSnapshot;
use crate::stats::BenchmarkResult;
use crate::target::BenchmarkPaths;
use crate::Result;
use std::path::PathBuf;

/// Writes every configured report format for one session
pub struct ReportGenerator<'a> {
    config: &'a BenchmarkConfig,
    paths: &'a BenchmarkPaths,
}

impl<'a> ReportGenerator<'a> {
    pub fn new(config: &'a BenchmarkConfig, paths: &'a BenchmarkPaths) -> Self {
        Self { config, paths }
    }

    /// Write all reports and return their paths, in configuration order
    pub fn write_all(&self, results: &[BenchmarkResult], metrics: &[MetricsSnapshot]) -> Result<Vec<PathBuf>> {
        let mut written = Vec::with_capacity(self.config.report_formats().len());
        for &format in self.config.report_formats() {
            written.push(self.write(format, results, metrics)?);
        }
        Ok(written)
    }

    pub fn write(
        &self,
        format: ReportFormat,
        results: &[BenchmarkResult],
        metrics: &[MetricsSnapshot],
    ) -> Result<PathBuf> {
        let path = self.paths.report_file_path(format.extension());
        let session_id = self.config.session_id();

        match format {
            ReportFormat::Csv => csv::write_csv_report(&path, results)?,
            ReportFormat::Json => {
                let payload = json::ReportPayload::new(session_id, results, metrics);
                json::write_json_report(&path, &payload)?
            }
            ReportFormat::Html => {
                let charts_dir = if self.config.embed_charts() {
                    Some(self.paths.ensure_charts_dir()?)
                } else {
                    None
                };
                html::write_html_report(&path, session_id, results, metrics, charts_dir.as_deref())?
            }
        }

        tracing::info!(format = format.extension(), path = %path.display(), "report written");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TestType;
    use chrono::Utc;
    use std::time::Duration;
    use tempfile::TempDir;

    fn results() -> Vec<BenchmarkResult> {
        vec![BenchmarkResult {
            run_id: 1,
            test_type: TestType::SeqRead,
            bytes_processed: 4096,
            elapsed: Duration::from_millis(3),
            throughput_mbps: 1.3,
            avg_latency_ms: 3.0,
            iops: 333.3,
            timestamp: Utc::now(),
        }]
    }

    #[test]
    fn test_write_all_default_formats() {
        let dir = TempDir::new().unwrap();
        let config = BenchmarkConfig::builder().test_directory(dir.path()).build().unwrap();
        let paths = BenchmarkPaths::new(dir.path(), config.session_id());

        let written = ReportGenerator::new(&config, &paths).write_all(&results(), &[]).unwrap();

        assert_eq!(written.len(), 2);
        assert_eq!(written[0], paths.report_file_path("csv"));
        assert_eq!(written[1], paths.report_file_path("json"));
        assert!(written.iter().all(|p| p.exists()));
        assert!(!paths.charts_dir().exists());
    }

    #[test]
    fn test_write_all_with_html_charts() {
        let dir = TempDir::new().unwrap();
        let config = BenchmarkConfig::builder()
            .test_directory(dir.path())
            .add_report_format(ReportFormat::Html)
            .embed_charts(true)
            .build()
            .unwrap();
        let paths = BenchmarkPaths::new(dir.path(), config.session_id());

        let results = results();
        let written = ReportGenerator::new(&config, &paths).write_all(&results, &[]).unwrap();

        assert_eq!(written.len(), 3);
        let page = std::fs::read_to_string(paths.report_file_path("html")).unwrap();
        assert!(page.contains("<svg"));
        assert!(paths.charts_dir().join(html::CHART_FILE_NAME).exists());

        let parsed = json::read_json_report(&paths.report_file_path("json")).unwrap();
        assert_eq!(parsed.results, results);
        assert_eq!(parsed.session_id, config.session_id());
    }
}
