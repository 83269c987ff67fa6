//! End-to-end run: sequences → search → classification → output

use crate::catalog::ModelCatalog;
use crate::config::Settings;
use crate::monitor::{MemoryMonitor, MemoryState, MonitorConfig, ReclaimHook};
use crate::search::{Dispatcher, HmmSearch, SearchTool};
use crate::sequences::SequenceSet;
use crate::typing::{render_report, write_tsv, ClassificationResult, Classifier, TypeMapping};
use anyhow::{Context, Result};
use chrono::Local;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Everything a run needs, resolved from settings and command-line flags
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub input: PathBuf,
    pub output: PathBuf,
    pub hmm_dir: PathBuf,
    pub model_extension: String,
    pub hmmsearch: PathBuf,
    pub cas_types_file: Option<PathBuf>,
    pub min_length: usize,
    pub threads: Option<usize>,
    pub report: Option<PathBuf>,
    pub dedup_by_query: bool,
    /// `None` disables the memory monitor
    pub monitor: Option<MonitorConfig>,
}

impl RunConfig {
    pub fn from_settings(settings: &Settings, input: PathBuf, output: PathBuf) -> Self {
        Self {
            input,
            output,
            hmm_dir: settings.search.hmm_dir.clone(),
            model_extension: settings.search.model_extension.clone(),
            hmmsearch: settings.search.hmmsearch.clone(),
            cas_types_file: settings.typing.cas_types_file.clone(),
            min_length: settings.sequences.min_length,
            threads: settings.search.threads,
            report: None,
            dedup_by_query: settings.typing.dedup_by_query,
            monitor: settings
                .monitor
                .enabled
                .then(|| settings.monitor.to_config()),
        }
    }
}

/// Outcome of a completed run
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub sequences: usize,
    pub models: usize,
    pub hits: usize,
    pub failed_models: Vec<String>,
    pub classifications: Vec<ClassificationResult>,
    pub peak_memory: Option<f64>,
}

/// Run context owning the configuration, the search tool and the optional
/// memory monitor
pub struct Pipeline {
    config: RunConfig,
    tool: Arc<dyn SearchTool>,
    /// Run by the memory monitor while usage is critical
    reclaimers: Vec<ReclaimHook>,
}

impl Pipeline {
    /// Pipeline using the configured `hmmsearch` binary
    pub fn new(config: RunConfig) -> Self {
        let tool = Arc::new(HmmSearch::new(config.hmmsearch.clone()));
        Self::with_tool(config, tool)
    }

    pub fn with_tool(config: RunConfig, tool: Arc<dyn SearchTool>) -> Self {
        Self {
            config,
            tool,
            reclaimers: Vec::new(),
        }
    }

    /// Register a hook that releases caller-owned memory under pressure.
    /// Ignored when the monitor is disabled.
    pub fn with_reclaimer(mut self, hook: ReclaimHook) -> Self {
        self.reclaimers.push(hook);
        self
    }

    /// Execute the run. Configuration errors fail before any search starts;
    /// per-model failures only reduce the hit count.
    pub async fn run(&self) -> Result<RunSummary> {
        let mut monitor = self.config.monitor.map(|config| {
            let monitor = MemoryMonitor::new(config);
            monitor.on_state(
                MemoryState::Critical,
                Arc::new(|percent: f64| -> Result<()> {
                    warn!(
                        "Memory at {:.1}%; consider lowering --threads",
                        percent
                    );
                    Ok(())
                }),
            );
            for hook in &self.reclaimers {
                monitor.add_reclaimer(hook.clone());
            }
            monitor
        });
        let handle = monitor.as_mut().and_then(MemoryMonitor::start);

        let result = self.execute().await;

        let peak = match handle {
            Some(handle) => Some(handle.stop().await),
            None => None,
        };
        if let Some(monitor) = &monitor {
            monitor.log_report();
        }

        result.map(|mut summary| {
            summary.peak_memory = peak;
            summary
        })
    }

    async fn execute(&self) -> Result<RunSummary> {
        let config = &self.config;
        info!("Analyzing {}", config.input.display());
        info!("Using model directory {}", config.hmm_dir.display());

        let catalog = ModelCatalog::discover_with_extension(&config.hmm_dir, &config.model_extension)?;

        let mut sequences = SequenceSet::from_file(&config.input)?;
        sequences.filter_min_length(config.min_length);
        sequences.dedup_ids();
        let stats = sequences.stats();
        info!(
            "{} sequences, average length {:.2}, shortest {}, longest {}",
            stats.count, stats.avg_length, stats.min_length, stats.max_length
        );

        let mut summary = RunSummary {
            sequences: sequences.len(),
            models: catalog.len(),
            ..Default::default()
        };

        let hits = if sequences.is_empty() {
            warn!("No sequences left after filtering, skipping search");
            Vec::new()
        } else {
            let fasta = sequences.write_temp()?;
            let collection = Dispatcher::new(self.tool.clone(), config.threads)
                .dispatch(&catalog, &fasta)
                .await?;
            summary.failed_models = collection
                .failures()
                .iter()
                .map(|f| f.model.clone())
                .collect();
            collection.into_hits()
        };
        summary.hits = hits.len();
        info!("Search found {} potential Cas protein hits", hits.len());

        let mapping = TypeMapping::load(config.cas_types_file.as_deref());
        let classifier = Classifier::new(mapping).with_dedup_by_query(config.dedup_by_query);
        debug!(
            "Classifying with {} mapping entries",
            classifier.mapping().len()
        );
        let results = classifier.classify_all(&hits);

        write_predictions(&config.output, &results)?;
        info!("Predictions written to {}", config.output.display());

        if let Some(report_path) = &config.report {
            std::fs::write(report_path, render_report(&results, Local::now()))
                .with_context(|| format!("failed to write report {}", report_path.display()))?;
            info!("Report written to {}", report_path.display());
        }

        summary.classifications = results;
        Ok(summary)
    }
}

fn write_predictions(path: &Path, results: &[ClassificationResult]) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    write_tsv(BufWriter::new(file), results)
        .with_context(|| format!("failed to write {}", path.display()))
}
