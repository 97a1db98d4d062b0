//! fungimap-validator - sample validation CLI
//!
//! `validate` screens accessions and writes a CSV report; `estimate` prints
//! resource estimates for processing their raw reads.
//!
//! Exits non-zero only on fatal configuration or storage errors. Samples that
//! fail validation are reported, not treated as errors.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter};

use fungimap_common::config::{resolve_config_path, ValidatorConfig};
use fungimap_common::{ValidationEvent, ValidationEventBus};
use fungimap_validator::services::{ResourceEstimator, ValidationReport};
use fungimap_validator::store::{accession_from_input, ArtifactLayout};
use fungimap_validator::ValidationOrchestrator;

/// Command-line arguments for fungimap-validator
#[derive(Parser, Debug)]
#[command(name = "fungimap-validator")]
#[command(about = "Screen metagenomic samples for downstream analysis")]
#[command(version)]
struct Args {
    /// Configuration file (JSON)
    #[arg(short, long, global = true, env = "FUNGIMAP_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate accessions and write a report
    Validate {
        /// Report output path (CSV)
        #[arg(short, long, default_value = "validation_report.csv")]
        output: PathBuf,

        /// Accessions per chunk
        #[arg(long)]
        batch_size: Option<usize>,

        /// Concurrent validations within a chunk
        #[arg(long)]
        workers: Option<usize>,

        /// Seconds before unfinished validations in a chunk are failed
        #[arg(long)]
        chunk_timeout_secs: Option<u64>,

        /// File with one accession or FASTQ path per line
        #[arg(long)]
        accessions_file: Option<PathBuf>,

        /// Accessions or FASTQ paths
        inputs: Vec<String>,
    },

    /// Estimate memory, disk and CPU needs for accessions
    Estimate {
        /// Accessions or FASTQ paths
        #[arg(required = true)]
        inputs: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Start at info so config loading is logged, then switch to the
    // configured level. RUST_LOG wins over both.
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let (filter, filter_handle) = reload::Layer::new(
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    );
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config_path = resolve_config_path(args.config.as_deref());
    let mut config = ValidatorConfig::load(&config_path)
        .with_context(|| format!("Failed to load configuration {}", config_path.display()))?;

    if let Some(filter) = configured_filter(rust_log.as_deref(), &config.logging.level) {
        if let Err(e) = filter_handle.reload(filter) {
            warn!(error = %e, "Could not apply configured log level");
        }
    }

    match args.command {
        Command::Validate {
            output,
            batch_size,
            workers,
            chunk_timeout_secs,
            accessions_file,
            inputs,
        } => {
            if let Some(batch_size) = batch_size {
                config.orchestrator.batch_size = batch_size;
            }
            if let Some(workers) = workers {
                config.orchestrator.worker_count = workers;
            }
            if let Some(secs) = chunk_timeout_secs {
                config.orchestrator.chunk_timeout_secs = secs;
            }

            let accessions = collect_accessions(&inputs, accessions_file.as_deref())?;
            run_validate(&config, &accessions, &output).await
        }
        Command::Estimate { inputs } => {
            let accessions: Vec<String> = inputs.iter().map(|i| accession_from_input(i)).collect();
            run_estimate(&config, &accessions).await
        }
    }
}

async fn run_validate(config: &ValidatorConfig, accessions: &[String], output: &Path) -> Result<()> {
    if accessions.is_empty() {
        warn!("No accessions given; writing an empty report");
    }

    let event_bus = ValidationEventBus::default();
    let mut events = event_bus.subscribe();
    let progress_task = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            if let ValidationEvent::ChunkCompleted {
                chunk_index,
                total_chunks,
                processed_count,
                failed_count,
                ..
            } = event
            {
                tracing::debug!(
                    chunk = chunk_index,
                    total_chunks,
                    processed = processed_count,
                    failed = failed_count,
                    "Progress event"
                );
            }
        }
    });

    let orchestrator = ValidationOrchestrator::from_config(config, event_bus)
        .context("Failed to initialize validation")?;
    info!(
        storage_root = %config.storage_root().display(),
        batch_size = orchestrator.settings().batch_size,
        workers = orchestrator.settings().worker_count,
        "Validator ready"
    );

    let outcome = orchestrator.validate_batch(accessions).await?;
    // Dropping the orchestrator closes the bus and ends the progress task
    drop(orchestrator);
    if let Err(e) = progress_task.await {
        warn!(error = %e, "Progress reporter terminated abnormally");
    }

    if outcome.failed_count > 0 {
        warn!(
            failed = outcome.failed_count,
            "Some validations failed unexpectedly; see warnings in the report"
        );
    }

    let report = ValidationReport::from_results(&outcome.results);
    report.log_summary();
    report
        .write_to_path(output)
        .with_context(|| format!("Failed to write report {}", output.display()))?;

    Ok(())
}

async fn run_estimate(config: &ValidatorConfig, accessions: &[String]) -> Result<()> {
    let estimator = ResourceEstimator::new(ArtifactLayout::new(config.storage_root()));
    let estimates = estimator.estimate_all(accessions).await;

    for estimate in &estimates {
        match &estimate.warning {
            Some(warning) => println!("{}\t{}", estimate.accession, warning),
            None => println!("{}\t{}", estimate.accession, estimate.estimate.display_string()),
        }
    }
    println!(
        "TOTAL\t{}",
        ResourceEstimator::total(&estimates).display_string()
    );
    Ok(())
}

/// Filter for the configured level, or None when RUST_LOG is set
///
/// An unparsable level falls back to info.
fn configured_filter(rust_log: Option<&str>, level: &str) -> Option<EnvFilter> {
    if rust_log.is_some() {
        return None;
    }
    Some(EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info")))
}

/// Positional inputs followed by the accessions file, in order
fn collect_accessions(inputs: &[String], accessions_file: Option<&Path>) -> Result<Vec<String>> {
    let mut accessions: Vec<String> = inputs.iter().map(|i| accession_from_input(i)).collect();

    if let Some(path) = accessions_file {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read accessions file {}", path.display()))?;
        accessions.extend(
            content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#'))
                .map(accession_from_input),
        );
    }

    if accessions.iter().any(|a| a.is_empty()) {
        bail!("Empty accession in input");
    }
    Ok(accessions)
}
