//! Tollgate CLI binary.
//!
//! This binary provides command-line access to Tollgate's functionality:
//! - Dispatch the jobs of a JSON-lines document file under quota
//! - Inspect how much of a run is done
//! - Export recorded results for downstream joins

use clap::Parser;
use tollgate::{TracingConfig, init_tracing};

mod cli;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use cli::{Cli, Commands, export_results, run_batch, show_pending};

    // Load API keys from .env if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let filter = if cli.verbose {
        "info,tollgate=debug"
    } else {
        "info"
    };
    init_tracing(TracingConfig::new(filter).with_json_logs(cli.json_logs))?;

    match cli.command {
        Commands::Run(args) => run_batch(&args).await?,
        Commands::Pending(args) => show_pending(&args).await?,
        Commands::Export(args) => export_results(&args).await?,
    }

    Ok(())
}
