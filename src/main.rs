//! cas-typer: CRISPR-Cas protein predictor
//!
//! This is the main entry point for the command-line tool.

use anyhow::Result;
use cas_typer::{config, Pipeline, RunConfig};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "cas-typer")]
#[command(author, version, about = "CRISPR-Cas protein predictor", long_about = None)]
struct Cli {
    /// Input FASTA file containing protein sequences
    input: PathBuf,

    /// Output file to save predictions
    output: PathBuf,

    /// Settings file (YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory containing HMM models
    #[arg(long)]
    hmm_dir: Option<PathBuf>,

    /// JSON or YAML file with the CAS type mapping
    #[arg(long)]
    cas_types_file: Option<PathBuf>,

    /// Search binary
    #[arg(long)]
    hmmsearch: Option<PathBuf>,

    /// Write a detailed report to this file
    #[arg(long)]
    report: Option<PathBuf>,

    /// Logging level
    #[arg(long, value_parser = ["ERROR", "WARN", "WARNING", "INFO", "DEBUG"], ignore_case = true)]
    log_level: Option<String>,

    /// Print log messages without timestamp, level or target
    #[arg(long)]
    simple_log: bool,

    /// Minimum protein length
    #[arg(long)]
    min_length: Option<usize>,

    /// Thread budget for parallel searching
    #[arg(long)]
    threads: Option<usize>,

    /// Keep only the best hit per protein
    #[arg(long)]
    dedup_by_query: bool,

    /// Watch system memory while searching
    #[arg(long)]
    memory_monitor: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Settings are needed before logging is configured, so problems loading
    // them are reported on stderr
    let settings = match config::load(cli.config.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("cas-typer: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    let level = cli.log_level.as_deref().unwrap_or(&settings.logging.level);
    init_logging(level, cli.simple_log || settings.logging.simple);

    info!("Starting cas-typer v{}", cas_typer::VERSION);

    match run(cli, &settings).await {
        Ok(()) => {
            info!("Analysis complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Run failed: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, settings: &cas_typer::Settings) -> Result<()> {
    let mut config = RunConfig::from_settings(settings, cli.input, cli.output);

    if let Some(dir) = cli.hmm_dir {
        config.hmm_dir = dir;
    }
    if let Some(file) = cli.cas_types_file {
        config.cas_types_file = Some(file);
    }
    if let Some(binary) = cli.hmmsearch {
        config.hmmsearch = binary;
    }
    if let Some(min_length) = cli.min_length {
        config.min_length = min_length;
    }
    if cli.threads.is_some() {
        config.threads = cli.threads;
    }
    if cli.dedup_by_query {
        config.dedup_by_query = true;
    }
    if cli.memory_monitor && config.monitor.is_none() {
        config.monitor = Some(settings.monitor.to_config());
    }
    config.report = cli.report;

    let summary = Pipeline::new(config).run().await?;

    info!(
        "{} sequences searched with {} models: {} hits, {} classifications",
        summary.sequences,
        summary.models,
        summary.hits,
        summary.classifications.len()
    );
    if !summary.failed_models.is_empty() {
        info!("Models that failed: {}", summary.failed_models.join(", "));
    }

    Ok(())
}

/// Install the global subscriber. `RUST_LOG` takes precedence when set.
fn init_logging(level: &str, simple: bool) {
    let level = match level.to_ascii_uppercase().as_str() {
        "ERROR" => Level::ERROR,
        "WARN" | "WARNING" => Level::WARN,
        "DEBUG" => Level::DEBUG,
        "TRACE" => Level::TRACE,
        _ => Level::INFO,
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()));

    let builder = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if simple {
        builder
            .without_time()
            .with_level(false)
            .init();
    } else {
        builder.init();
    }
}
