//! Patterns command - inspect and export the field extraction rules.

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args, Subcommand};
use console::style;

use procura_core::PatternTable;

use super::{load_config, load_patterns};

/// Arguments for the patterns command.
#[derive(Args)]
pub struct PatternsArgs {
    #[command(subcommand)]
    command: PatternsCommand,
}

#[derive(Subcommand)]
enum PatternsCommand {
    /// List fields and their rules in priority order
    List {
        /// Only show this field
        field: Option<String>,
    },

    /// Write the pattern table as JSON
    Export {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Export the built-in table even when a pattern file is configured
        #[arg(long)]
        builtin: bool,
    },

    /// Check that a pattern file loads and compiles
    Check {
        /// Pattern table JSON file
        file: PathBuf,
    },
}

pub async fn run(args: PatternsArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    match args.command {
        PatternsCommand::List { field } => {
            let table = load_patterns(&load_config(config_path)?)?;
            list_patterns(&table, field.as_deref())
        }
        PatternsCommand::Export { output, builtin } => {
            let table = if builtin {
                PatternTable::builtin()
            } else {
                load_patterns(&load_config(config_path)?)?
            };
            export_patterns(&table, output)
        }
        PatternsCommand::Check { file } => check_patterns(&file),
    }
}

fn list_patterns(table: &PatternTable, only: Option<&str>) -> anyhow::Result<()> {
    if let Some(field) = only {
        if table.rules(field).is_none() {
            anyhow::bail!("Unknown field: {}", field);
        }
    }

    for entry in table.fields().filter(|f| only.is_none_or(|name| f.field == name)) {
        println!("{}", style(&entry.field).bold());
        for (index, rule) in entry.rules.iter().enumerate() {
            println!("  {:>2}. {}", index + 1, rule.source());
        }
    }
    Ok(())
}

fn export_patterns(table: &PatternTable, output: Option<PathBuf>) -> anyhow::Result<()> {
    let json = table.to_json()?;

    match output {
        Some(path) => {
            fs::write(&path, json)?;
            eprintln!(
                "{} Pattern table written to {}",
                style("✓").green(),
                path.display()
            );
        }
        None => println!("{}", json),
    }
    Ok(())
}

fn check_patterns(file: &Path) -> anyhow::Result<()> {
    let table = PatternTable::from_file(file)?;
    let rules: usize = table.fields().map(|f| f.rules.len()).sum();

    println!(
        "{} {} fields, {} rules",
        style("✓").green(),
        table.len(),
        rules
    );
    Ok(())
}
