//! CLI parse: clap types for Rezi. No behavior; definitions only.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Rezi CLI - bring your childhood and present selves together
#[derive(Parser)]
#[command(name = "rezi")]
#[command(about = "Composite a childhood photo and a current photo into one nostalgic image")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging (default: off)
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Disable logging entirely
    #[arg(long, default_value = "false")]
    pub quiet: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output is "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the credit balance (initialises it on first run)
    Credits {
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Generate an image from two photos and a prompt
    Generate {
        /// Childhood photo (PNG, JPG, or WEBP)
        #[arg(long)]
        childhood: PathBuf,

        /// Current photo (PNG, JPG, or WEBP)
        #[arg(long)]
        current: PathBuf,

        /// Scene description (defaults to the configured prompt)
        #[arg(long)]
        prompt: Option<String>,

        /// Directory to save the result into
        #[arg(long)]
        out: Option<PathBuf>,

        /// Share the result after saving it
        #[arg(long)]
        share: bool,
    },
    /// List the messages shown while an image is being generated
    Facts,
    /// Print the effective configuration (API key masked)
    Config,
}
