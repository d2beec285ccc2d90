//! HTML report
//!
//! A self-contained page: run table, sampled system metrics and, when charts
//! are enabled, an inline SVG bar chart of per-run throughput. The chart is
//! also written next to the report under `charts-<session>/throughput.svg`.

use crate::error::Error;
use crate::monitor::MetricsSnapshot;
use crate::stats::BenchmarkResult;
use crate::Result;
use std::fmt;
use std::fs;
use std::path::Path;

pub const CHART_FILE_NAME: &str = "throughput.svg";

const BAR_WIDTH: usize = 36;
const BAR_GAP: usize = 12;
const CHART_HEIGHT: f64 = 240.0;
const MARGIN: usize = 40;

/// Escape the five characters HTML cares about
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Bar chart of throughput per run, one bar per result in run order
pub fn render_throughput_svg(results: &[BenchmarkResult]) -> String {
    let mut svg = String::new();
    // Writing into a String never fails
    let _ = write_throughput_svg(&mut svg, results);
    svg
}

fn write_throughput_svg(svg: &mut impl fmt::Write, results: &[BenchmarkResult]) -> fmt::Result {
    let max = results.iter().map(|r| r.throughput_mbps).fold(0.0_f64, f64::max);
    let width = MARGIN * 2 + results.len().max(1) * (BAR_WIDTH + BAR_GAP);
    let height = CHART_HEIGHT as usize + MARGIN * 2;

    writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" viewBox="0 0 {width} {height}">"#
    )?;
    writeln!(svg, r#"<title>Throughput per run (MB/s)</title>"#)?;

    for (i, result) in results.iter().enumerate() {
        let bar_height = if max > 0.0 {
            result.throughput_mbps / max * CHART_HEIGHT
        } else {
            0.0
        };
        let x = MARGIN + i * (BAR_WIDTH + BAR_GAP);
        let y = MARGIN as f64 + CHART_HEIGHT - bar_height;
        writeln!(
            svg,
            r#"<rect class="{}" x="{x}" y="{y:.1}" width="{BAR_WIDTH}" height="{bar_height:.1}"><title>run {} {}: {:.2} MB/s</title></rect>"#,
            result.test_type.descriptor(),
            result.run_id,
            result.test_type,
            result.throughput_mbps,
        )?;
        writeln!(
            svg,
            r#"<text x="{}" y="{}" font-size="10" text-anchor="middle">{}</text>"#,
            x + BAR_WIDTH / 2,
            height - MARGIN / 2,
            result.run_id,
        )?;
    }

    svg.write_str("</svg>\n")
}

/// Render the full HTML page
///
/// `chart` is the SVG markup to embed, if charts are enabled.
pub fn render_html(
    session_id: &str,
    results: &[BenchmarkResult],
    metrics: &[MetricsSnapshot],
    chart: Option<&str>,
) -> String {
    let mut html = String::new();
    // Writing into a String never fails
    let _ = write_html(&mut html, session_id, results, metrics, chart);
    html
}

fn write_html(
    html: &mut impl fmt::Write,
    session_id: &str,
    results: &[BenchmarkResult],
    metrics: &[MetricsSnapshot],
    chart: Option<&str>,
) -> fmt::Result {
    let title = format!("storemark report {}", escape(session_id));

    writeln!(html, "<!DOCTYPE html>")?;
    writeln!(html, "<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>")?;
    html.write_str(STYLE)?;
    writeln!(html, "</head>\n<body>\n<h1>{title}</h1>")?;

    html.write_str("<h2>Results</h2>\n<table>\n")?;
    html.write_str("<tr><th>RunId</th><th>TestType</th><th>Throughput MB/s</th><th>Latency ms</th><th>IOPS</th></tr>\n")?;
    for r in results {
        writeln!(
            html,
            "<tr><td>{}</td><td>{}</td><td>{:.2}</td><td>{:.2}</td><td>{:.2}</td></tr>",
            r.run_id, r.test_type, r.throughput_mbps, r.avg_latency_ms, r.iops
        )?;
    }
    html.write_str("</table>\n")?;

    if let Some(svg) = chart {
        html.write_str("<h2>Throughput</h2>\n<div class=\"chart\">\n")?;
        html.write_str(svg)?;
        html.write_str("</div>\n")?;
    }

    html.write_str("<h2>System metrics</h2>\n")?;
    if metrics.is_empty() {
        html.write_str("<p>No metrics collected.</p>\n")?;
    } else {
        html.write_str("<ul>\n")?;
        for m in metrics {
            let temperature = m
                .disk_temperature_c
                .map(|t| format!(", disk {:.1} &deg;C", t))
                .unwrap_or_default();
            writeln!(
                html,
                "<li>{}: CPU {:.1}%, RAM {:.1}%, disk {:.1}%{}</li>",
                m.timestamp.to_rfc3339(),
                m.cpu_percent,
                m.ram_percent,
                m.disk_percent,
                temperature,
            )?;
        }
        html.write_str("</ul>\n")?;
    }

    html.write_str("</body>\n</html>\n")
}

/// Write the HTML report to `path`; with `charts_dir`, also write the SVG there
pub fn write_html_report(
    path: &Path,
    session_id: &str,
    results: &[BenchmarkResult],
    metrics: &[MetricsSnapshot],
    charts_dir: Option<&Path>,
) -> Result<()> {
    let chart = match charts_dir {
        Some(dir) => {
            let svg = render_throughput_svg(results);
            let chart_path = dir.join(CHART_FILE_NAME);
            fs::write(&chart_path, &svg)
                .map_err(|e| Error::io(format!("writing chart {}", chart_path.display()), e))?;
            Some(svg)
        }
        None => None,
    };

    let html = render_html(session_id, results, metrics, chart.as_deref());
    fs::write(path, html).map_err(|e| Error::io(format!("writing HTML report {}", path.display()), e))
}

const STYLE: &str = r#"<style>
body { font-family: sans-serif; margin: 2em; }
table { border-collapse: collapse; }
th, td { border: 1px solid #ccc; padding: 4px 10px; text-align: right; }
th { background: #f0f0f0; }
rect.seq_read { fill: #4e79a7; }
rect.seq_write { fill: #f28e2b; }
rect.rand_read { fill: #59a14f; }
rect.rand_write { fill: #e15759; }
</style>
"#;
