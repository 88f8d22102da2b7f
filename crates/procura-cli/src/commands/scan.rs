//! Scan command - aggregate the fields of every document in a directory.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use console::style;

use procura_core::{BatchAggregator, BatchReport, ProcuraError, ResolvedContext};

use super::{OutputFormat, build_aggregator, load_config, run_batch};

/// Arguments for the scan command.
#[derive(Args)]
pub struct ScanArgs {
    /// Directory holding the source documents
    #[arg(required = true)]
    input_dir: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Show every candidate value instead of the resolved context
    #[arg(long)]
    candidates: bool,
}

pub async fn run(args: ScanArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;

    if !args.input_dir.is_dir() {
        anyhow::bail!("Input directory not found: {}", args.input_dir.display());
    }

    let files = BatchAggregator::collect_inputs(&args.input_dir)?;
    eprintln!(
        "{} Found {} files to process",
        style("ℹ").blue(),
        files.len()
    );

    let report = run_batch(build_aggregator(&config)?, files).await?;
    if report.is_empty() {
        return Err(ProcuraError::NoDataExtracted(args.input_dir.clone()).into());
    }

    let context = report.resolve();
    let output = match (args.format, args.candidates) {
        (OutputFormat::Json, false) => serde_json::to_string_pretty(&context)?,
        (OutputFormat::Json, true) => serde_json::to_string_pretty(&report)?,
        (OutputFormat::Text, false) => format_context(&context),
        (OutputFormat::Text, true) => format_candidates(&report),
    };

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        eprintln!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output);
    }

    print_summary(&report, start.elapsed());
    Ok(())
}

fn format_context(context: &ResolvedContext) -> String {
    context
        .iter()
        .map(|(field, value)| format!("{}: {}\n", field, value))
        .collect()
}

fn format_candidates(report: &BatchReport) -> String {
    let mut output = String::new();
    for (field, candidates) in &report.candidates {
        output.push_str(&format!("{}:\n", field));
        for candidate in candidates {
            output.push_str(&format!(
                "  {} ({})\n",
                candidate.value,
                candidate.source.display()
            ));
        }
    }
    output
}

/// Per-run summary on stderr, keeping stdout for the result.
pub(crate) fn print_summary(report: &BatchReport, elapsed: std::time::Duration) {
    let failed: Vec<_> = report.files.iter().filter(|f| f.error.is_some()).collect();

    eprintln!(
        "{} Processed {} files in {:?}, {} fields resolved",
        style("✓").green(),
        report.files.len(),
        elapsed,
        report.resolve().len()
    );

    if !failed.is_empty() {
        eprintln!("{}", style("Unreadable files:").yellow());
        for file in failed {
            eprintln!(
                "  - {}: {}",
                file.path.display(),
                file.error.as_deref().unwrap_or("unknown error")
            );
        }
    }
}
