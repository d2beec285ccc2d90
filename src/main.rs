//! storemark CLI entry point

use anyhow::{Context, Result};
use std::sync::Arc;
use storemark::config::{cli::Cli, cli_convert, toml as config_file, BenchmarkConfig};
use storemark::coordinator::RunOrchestrator;
use storemark::monitor::synthetic::SyntheticMetricsSource;
use storemark::output::{text, ReportGenerator};
use tracing_subscriber::EnvFilter;

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse_args();

    let mut builder = BenchmarkConfig::builder();
    let mut synthetic_metrics = cli.synthetic_metrics;
    if let Some(path) = &cli.config {
        let file = config_file::parse_toml_file(path)
            .with_context(|| format!("Failed to load config file {}", path.display()))?;
        synthetic_metrics |= file.synthetic_metrics();
        builder = file.apply(builder)?;
    }
    builder = cli_convert::apply_cli(&cli, builder)?;
    let config = builder.build().context("Configuration validation failed")?;

    init_tracing(config.verbosity());

    if cli.dry_run {
        println!("{}", serde_json::to_string_pretty(&config)?);
        println!();
        println!("Dry run mode - configuration validated successfully");
        return Ok(());
    }

    let config = Arc::new(config);
    let mut orchestrator = RunOrchestrator::new(Arc::clone(&config));
    if synthetic_metrics {
        orchestrator = orchestrator.with_metrics_source(Box::new(SyntheticMetricsSource::new()));
    }

    println!("storemark v{}", env!("CARGO_PKG_VERSION"));
    println!("{}", orchestrator.header());
    println!();

    let results = orchestrator.run_all().context("Benchmark session failed")?;
    let metrics = orchestrator.snapshots();

    let written = ReportGenerator::new(&config, orchestrator.paths())
        .write_all(&results, &metrics)
        .context("Failed to write reports")?;

    text::print_summary(&config, &results);
    println!();
    println!("Reports:");
    for path in written {
        println!("  {}", path.display());
    }
    Ok(())
}

/// Verbosity 0/1/2 maps to warn/info/debug; RUST_LOG directives still apply
fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"))
        .add_directive(
            format!("storemark={}", level)
                .parse()
                .unwrap_or_else(|_| tracing_subscriber::filter::LevelFilter::INFO.into()),
        );

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
