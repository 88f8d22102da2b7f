//! CLI subcommands.

pub mod config;
pub mod extract;
pub mod generate;
pub mod patterns;
pub mod scan;

use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};
use tracing::debug;

use procura_core::{BatchAggregator, BatchReport, DocumentReader, FieldExtractor, PatternTable, ProcuraConfig};

/// Output format for extraction results.
#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// Plain text, one field per line
    Text,
}

/// Load the configuration named on the command line, or the default
/// config file when it exists, or built-in defaults.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<ProcuraConfig> {
    if let Some(path) = config_path {
        debug!("Loading config from {}", path);
        return Ok(ProcuraConfig::from_file(Path::new(path))?);
    }

    let default_path = config::default_config_path();
    if default_path.exists() {
        debug!("Loading config from {}", default_path.display());
        Ok(ProcuraConfig::from_file(&default_path)?)
    } else {
        Ok(ProcuraConfig::default())
    }
}

/// Pattern table selected by the configuration.
pub fn load_patterns(config: &ProcuraConfig) -> anyhow::Result<PatternTable> {
    let table = PatternTable::load(config.extraction.pattern_file.as_deref())?;
    debug!("Pattern table has {} fields", table.len());
    Ok(table)
}

pub fn build_aggregator(config: &ProcuraConfig) -> anyhow::Result<BatchAggregator> {
    Ok(BatchAggregator::new(
        DocumentReader::from_config(config),
        FieldExtractor::new(load_patterns(config)?),
    ))
}

/// Run a batch off the async runtime, with a progress bar over the files.
pub async fn run_batch(aggregator: BatchAggregator, files: Vec<PathBuf>) -> anyhow::Result<BatchReport> {
    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files {msg}")
            .unwrap()
            .progress_chars("=>-"),
    );

    let bar = pb.clone();
    let report = tokio::task::spawn_blocking(move || {
        aggregator.process_files(&files, |_, outcome| {
            let name = outcome
                .path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            bar.set_message(name);
            bar.inc(1);
        })
    })
    .await?;

    pb.finish_and_clear();
    Ok(report)
}
