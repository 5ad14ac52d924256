//! CLI command definitions.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tollgate::MAX_SEGMENT_TOKENS;

/// Tollgate - rate-governed batch dispatch of LLM completion and embedding calls
#[derive(Parser, Debug)]
#[command(name = "tollgate")]
#[command(about = "Rate-governed batch dispatch of LLM completion and embedding calls", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Dispatch every job of a document file that has no recorded result
    Run(RunArgs),

    /// Show how many jobs of a document file are done, failed or still to do
    Pending(PendingArgs),

    /// Write recorded successes as JSON lines
    Export(ExportArgs),
}

/// Options for `tollgate run`
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// JSON-lines document file
    #[arg(long)]
    pub documents: PathBuf,

    /// Checkpoint file (defaults to the configured path)
    #[arg(long)]
    pub checkpoint: Option<PathBuf>,

    /// Provider whose tiers to use
    #[arg(long, default_value = "openai")]
    pub provider: String,

    /// Tier name (defaults to the provider's default tier)
    #[arg(long)]
    pub tier: Option<String>,

    /// Number of concurrent workers
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Fraction of the RPM limit to use (0.0-1.0)
    #[arg(long)]
    pub rpm_multiplier: Option<f64>,

    /// Fraction of the TPM limit to use (0.0-1.0)
    #[arg(long)]
    pub tpm_multiplier: Option<f64>,

    /// Maximum tokens per chunk
    #[arg(long, default_value_t = MAX_SEGMENT_TOKENS)]
    pub max_segment_tokens: usize,

    /// Also re-run jobs recorded as failed
    #[arg(long)]
    pub retry_failed: bool,

    /// Override the API base URL
    #[arg(long)]
    pub base_url: Option<String>,
}

/// Options for `tollgate pending`
#[derive(Args, Debug, Clone)]
pub struct PendingArgs {
    /// JSON-lines document file
    #[arg(long)]
    pub documents: PathBuf,

    /// Checkpoint file (defaults to the configured path)
    #[arg(long)]
    pub checkpoint: Option<PathBuf>,

    /// Maximum tokens per chunk
    #[arg(long, default_value_t = MAX_SEGMENT_TOKENS)]
    pub max_segment_tokens: usize,
}

/// Options for `tollgate export`
#[derive(Args, Debug, Clone)]
pub struct ExportArgs {
    /// Checkpoint file (defaults to the configured path)
    #[arg(long)]
    pub checkpoint: Option<PathBuf>,

    /// Output file (defaults to stdout)
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}
