//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod enhance;
mod models;
mod scan;
mod status;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::Config;

#[derive(Parser)]
#[command(name = "scribe")]
#[command(about = "OCR scanned documents and let Gemini correct and classify the text")]
#[command(version)]
pub struct Cli {
    /// Config file path (overrides auto-discovery)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Extract text from a scanned image, optionally correcting it with Gemini
    Scan(scan::ScanArgs),

    /// Write the OCR-enhanced version of an image
    Enhance {
        /// Image to enhance
        image: PathBuf,
        /// Where to write the result (format from extension)
        output: PathBuf,
    },

    /// List Gemini models usable for correction
    Models,

    /// Show OCR engine, API key and configuration status
    Status,
}

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref())
        .await
        .map_err(anyhow::Error::msg)?;

    match cli.command {
        Commands::Scan(args) => scan::cmd_scan(&config, args).await,
        Commands::Enhance { image, output } => enhance::cmd_enhance(&image, &output),
        Commands::Models => models::cmd_models(&config).await,
        Commands::Status => status::cmd_status(&config),
    }
}
