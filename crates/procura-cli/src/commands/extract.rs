//! Extract command - read a single document and show the fields found.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use console::style;
use serde::Serialize;
use tracing::{debug, info};

use procura_core::{DocumentReader, ExtractedFields, FieldExtractor};

use super::{OutputFormat, load_config, load_patterns};

/// Arguments for the extract command.
#[derive(Args)]
pub struct ExtractArgs {
    /// Input file (PDF, DOCX or image)
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Include the raw text read from the document
    #[arg(long)]
    show_text: bool,
}

#[derive(Serialize)]
struct Extraction<'a> {
    file: &'a PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<&'a str>,
    fields: &'a ExtractedFields,
}

pub async fn run(args: ExtractArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    info!("Processing file: {}", args.input.display());

    let reader = DocumentReader::from_config(&config);
    let extractor = FieldExtractor::new(load_patterns(&config)?);

    let input = args.input.clone();
    let (text, fields) = tokio::task::spawn_blocking(move || -> anyhow::Result<_> {
        let text = reader.read_file(&input)?;
        let fields = extractor.extract(&text);
        Ok((text, fields))
    })
    .await??;

    let output = match args.format {
        OutputFormat::Json => serde_json::to_string_pretty(&Extraction {
            file: &args.input,
            text: args.show_text.then_some(text.as_str()),
            fields: &fields,
        })?,
        OutputFormat::Text => format_text(&text, &fields, args.show_text),
    };

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output);
    }

    debug!("Total processing time: {:?}", start.elapsed());
    Ok(())
}

fn format_text(text: &str, fields: &ExtractedFields, show_text: bool) -> String {
    let mut output = String::new();

    if show_text {
        output.push_str(text.trim_end());
        output.push_str("\n\n");
    }

    if fields.is_empty() {
        output.push_str("No fields found.\n");
    }
    for (field, value) in fields {
        output.push_str(&format!("{}: {}\n", field, value));
    }
    output
}
