//! Generate command - fill the document template from a directory of sources.

use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use console::style;
use tracing::info;

use procura_core::{
    BatchAggregator, DocxTemplateRenderer, FieldCompleter, NoCompletion, ProcuraError, TemplateRenderer,
    complete_context, required_fields, validate_field,
};

use super::scan::print_summary;
use super::{build_aggregator, load_config, run_batch};
use crate::prompt::ConsoleCompleter;

/// Arguments for the generate command.
#[derive(Args)]
pub struct GenerateArgs {
    /// Directory holding the source documents
    #[arg(required = true)]
    input_dir: PathBuf,

    /// DOCX template (default: from config)
    #[arg(short, long)]
    template: Option<PathBuf>,

    /// Output document (default: <output_dir>/<file_prefix><input dir name>.docx)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Supply a field value, e.g. --set national-id=1800201123456
    #[arg(long = "set", value_name = "FIELD=VALUE")]
    values: Vec<String>,

    /// Fail on missing fields instead of asking for them
    #[arg(long)]
    no_prompt: bool,
}

pub async fn run(args: GenerateArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;

    if !args.input_dir.is_dir() {
        anyhow::bail!("Input directory not found: {}", args.input_dir.display());
    }

    let template = args.template.clone().unwrap_or_else(|| config.output.template.clone());
    if !template.is_file() {
        anyhow::bail!("Template not found: {}", template.display());
    }

    let aggregator = build_aggregator(&config)?;
    let required: Vec<String> = required_fields(aggregator.extractor().table())
        .into_iter()
        .map(String::from)
        .collect();

    let files = BatchAggregator::collect_inputs(&args.input_dir)?;
    let report = run_batch(aggregator, files).await?;
    print_summary(&report, start.elapsed());

    if report.is_empty() {
        return Err(ProcuraError::NoDataExtracted(args.input_dir.clone()).into());
    }

    let mut context = report.resolve();
    for assignment in &args.values {
        let (field, value) = parse_assignment(assignment)?;
        context.insert(field, value);
    }

    let mut completer: Box<dyn FieldCompleter> = if args.no_prompt {
        Box::new(NoCompletion)
    } else {
        Box::new(ConsoleCompleter::new())
    };
    let required: Vec<&str> = required.iter().map(String::as_str).collect();
    let context = complete_context(context, &required, completer.as_mut())?;

    let output = match &args.output {
        Some(path) => path.clone(),
        // "." has no file name to build the default from
        None => {
            let input_dir = args.input_dir.canonicalize().unwrap_or_else(|_| args.input_dir.clone());
            config.output.output_path_for(&input_dir)
        }
    };

    info!("Rendering {} into {}", template.display(), output.display());
    DocxTemplateRenderer::new().render(&template, &context, &output)?;

    println!(
        "{} Document written to {}",
        style("✓").green(),
        output.display()
    );
    Ok(())
}

/// Split and validate one `--set FIELD=VALUE` argument.
fn parse_assignment(assignment: &str) -> anyhow::Result<(&str, &str)> {
    let (field, value) = assignment
        .split_once('=')
        .ok_or_else(|| anyhow::anyhow!("Expected FIELD=VALUE, got {:?}", assignment))?;
    let (field, value) = (field.trim(), value.trim());
    validate_field(field, value)?;
    Ok((field, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_assignment_trims() {
        assert_eq!(
            parse_assignment(" full-name = Ion Popescu ").unwrap(),
            ("full-name", "Ion Popescu")
        );
        assert_eq!(
            parse_assignment("company-tax-id=RO12345678").unwrap(),
            ("company-tax-id", "RO12345678")
        );
    }

    #[test]
    fn test_parse_assignment_validates_value() {
        let err = parse_assignment("national-id=12").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ProcuraError>(),
            Some(ProcuraError::InvalidField { .. })
        ));
        assert!(parse_assignment("full-name=").is_err());
    }

    #[test]
    fn test_parse_assignment_needs_equals() {
        assert!(parse_assignment("national-id").is_err());
    }
}
