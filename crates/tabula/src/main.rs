//! Tabula CLI - screenshot-to-JSON table extraction with multimodal LLMs.
//!
//! Tabula sends folders of table screenshots to a multimodal model and writes
//! the extracted tables as JSON. Several models can be run over the same
//! folder and their outputs cross-checked for agreement.
//!
//! # Usage
//!
//! ```bash
//! # Extract tables, one model call per screenshot
//! tabula extract ./shots --provider openai --model gpt-4o
//!
//! # One call carrying every screenshot
//! tabula extract ./shots --provider google --model gemini-1.5-pro --mode joint
//!
//! # Run several models and compare their outputs
//! tabula cross-check ./shots --agent openai:gpt-4o --agent google:gemini-1.5-pro
//!
//! # Compare existing outputs
//! tabula compare a.json b.json
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cli;
mod logging;

/// Tabula - extract HTML table screenshots to JSON with multimodal LLMs.
#[derive(Parser, Debug)]
#[command(name = "tabula")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true, env = "TABULA_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Extract tables from a folder of screenshots with one model
    Extract(cli::extract::ExtractArgs),

    /// Run several models over the same folder and compare their outputs
    CrossCheck(cli::cross_check::CrossCheckArgs),

    /// Compare JSON output files, ignoring array order
    Compare(cli::compare::CompareArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logging isn't initialized yet, so use eprintln for config warnings.
    let loaded = match &cli.config {
        Some(path) => tabula_core::Config::load_from(path),
        None => tabula_core::Config::load(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Warning: Failed to load config: {e}\n  \
                 Using default configuration. Check your config file with `tabula config path`."
            );
            tabula_core::Config::default()
        }
    };
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("Tabula v{}", tabula_core::VERSION);

    match cli.command {
        Commands::Extract(args) => cli::extract::execute(args, &config).await,
        Commands::CrossCheck(args) => cli::cross_check::execute(args, &config).await,
        Commands::Compare(args) => cli::compare::execute(args).await,
        Commands::Config(args) => cli::config::execute(args, cli.config.as_deref()).await,
    }
}
