//! Command-line interface module.
//!
//! This module provides the CLI structure and command handlers for the tollgate binary.

mod checkpoint;
mod commands;
mod run;

use std::path::PathBuf;
use tollgate::TollgateConfig;

pub use checkpoint::{export_results, show_pending};
pub use commands::{Cli, Commands, ExportArgs, PendingArgs, RunArgs};
pub use run::run_batch;

/// Checkpoint file from the command line, or the configured one.
fn checkpoint_path(config: &TollgateConfig, cli: Option<&PathBuf>) -> PathBuf {
    cli.map(PathBuf::clone)
        .unwrap_or_else(|| config.checkpoint.path().to_path_buf())
}
