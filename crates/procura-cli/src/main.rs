//! CLI application for generating powers of attorney from identity documents.

mod commands;
mod prompt;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use commands::{config, extract, generate, patterns, scan};

/// Procura - Read identity documents and fill in a power of attorney
#[derive(Parser)]
#[command(name = "procura")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read a single document and show the fields found
    Extract(extract::ExtractArgs),

    /// Read every document in a directory and resolve the fields
    Scan(scan::ScanArgs),

    /// Fill the document template from a directory of sources
    Generate(generate::GenerateArgs),

    /// Inspect and export the extraction rules
    Patterns(patterns::PatternsArgs),

    /// Manage configuration
    Config(config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Extract(args) => extract::run(args, cli.config.as_deref()).await,
        Commands::Scan(args) => scan::run(args, cli.config.as_deref()).await,
        Commands::Generate(args) => generate::run(args, cli.config.as_deref()).await,
        Commands::Patterns(args) => patterns::run(args, cli.config.as_deref()).await,
        Commands::Config(args) => config::run(args).await,
    }
}
