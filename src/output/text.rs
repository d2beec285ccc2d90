//! Human-readable text output

use crate::config::BenchmarkConfig;
use crate::stats::aggregator::{summarize, TestTypeSummary};
use crate::stats::BenchmarkResult;
use crate::util::format::{format_bytes, format_duration, format_number, format_rate};
use std::fmt;

const RULE: &str = "═══════════════════════════════════════════════════════════";

/// Render the session summary: configuration, per-run lines and aggregates
pub fn render_summary(config: &BenchmarkConfig, results: &[BenchmarkResult]) -> String {
    let mut out = String::new();
    // Writing into a String never fails
    let _ = write_summary(&mut out, config, results);
    out
}

/// Write the session summary into any formatter sink
pub fn write_summary(out: &mut impl fmt::Write, config: &BenchmarkConfig, results: &[BenchmarkResult]) -> fmt::Result {
    writeln!(out, "{RULE}")?;
    writeln!(out, "                    BENCHMARK RESULTS")?;
    writeln!(out, "{RULE}")?;
    writeln!(out)?;

    writeln!(out, "Session:    {}", config.session_id())?;
    writeln!(out, "Directory:  {}", config.test_directory().display())?;
    writeln!(
        out,
        "File size:  {}  Block size: {}  Threads: {}  Mode: {}",
        format_bytes(config.file_size_bytes()),
        format_bytes(config.block_size_bytes()),
        config.threads(),
        config.io_mode(),
    )?;
    writeln!(out)?;

    writeln!(out, "Runs:")?;
    for r in results {
        writeln!(
            out,
            "  #{:<3} {:<10} {:>10.2} MB/s  {:>8.3} ms  {:>8} IOPS  ({})",
            r.run_id,
            r.test_type.as_str(),
            r.throughput_mbps,
            r.avg_latency_ms,
            format_rate(r.iops),
            format_duration(r.elapsed),
        )?;
    }
    writeln!(out)?;

    let summaries = summarize(results);
    if !summaries.is_empty() {
        writeln!(out, "Summary:")?;
        for s in &summaries {
            write_type_summary(out, s)?;
        }
        writeln!(out)?;
    }

    writeln!(out, "{RULE}")
}

fn write_type_summary(out: &mut impl fmt::Write, s: &TestTypeSummary) -> fmt::Result {
    writeln!(out, "  {} ({} runs, {} processed):", s.test_type, s.runs, format_bytes(s.total_bytes))?;
    writeln!(
        out,
        "    Throughput: mean {:.2} MB/s, min {:.2}, max {:.2}, cv {:.1}%",
        s.mean_throughput_mbps,
        s.min_throughput_mbps,
        s.max_throughput_mbps,
        s.throughput_cv_percent(),
    )?;
    writeln!(out, "    Latency:    mean {:.3} ms", s.mean_latency_ms)?;
    writeln!(out, "    IOPS:       mean {}", format_number(s.mean_iops.round() as u64))
}

/// Print the session summary to stdout
pub fn print_summary(config: &BenchmarkConfig, results: &[BenchmarkResult]) {
    print!("{}", render_summary(config, results));
}
