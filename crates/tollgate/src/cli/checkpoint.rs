//! Checkpoint inspection and export command handlers.

use super::{ExportArgs, PendingArgs, checkpoint_path};
use std::io::BufWriter;
use tollgate::{
    CheckpointError, CheckpointErrorKind, CheckpointStore, DocumentSegmenter,
    FileSystemCheckpointStore, ResultCollector, TokenCounter, TollgateConfig, TollgateResult,
    export_successes, read_documents,
};
use tracing::info;

/// Print how many jobs of a document file are done, failed or untouched.
pub async fn show_pending(args: &PendingArgs) -> TollgateResult<()> {
    let config = TollgateConfig::load()?;
    let path = checkpoint_path(&config, args.checkpoint.as_ref());

    let records = read_documents(&args.documents)?;
    let jobs = DocumentSegmenter::new(TokenCounter::cl100k()?)
        .with_max_segment_tokens(args.max_segment_tokens)
        .jobs_for_all(&records)?;

    let collector = ResultCollector::open(FileSystemCheckpointStore::new(&path)?, &config.checkpoint)
        .await?;
    let total = jobs.len();
    let pending = collector.pending(jobs.clone()).await.count();
    let untouched = collector.untouched(jobs).await.count();

    println!("\nCheckpoint: {}", path.display());
    println!("Documents: {}", records.len());
    println!("Jobs: {}", total);
    println!("Succeeded: {}", total - pending);
    println!("Failed: {}", pending - untouched);
    println!("Not yet run: {}", untouched);
    println!();

    Ok(())
}

/// Write every recorded success as a JSON line.
pub async fn export_results(args: &ExportArgs) -> TollgateResult<()> {
    let config = TollgateConfig::load()?;
    let path = checkpoint_path(&config, args.checkpoint.as_ref());

    let checkpoint = FileSystemCheckpointStore::new(&path)?
        .load()
        .await?
        .ok_or_else(|| {
            CheckpointError::new(CheckpointErrorKind::FileRead(format!(
                "{}: no checkpoint found",
                path.display()
            )))
        })?;

    let written = match &args.output {
        Some(output) => {
            let file = std::fs::File::create(output).map_err(|e| {
                CheckpointError::new(CheckpointErrorKind::FileWrite(format!(
                    "{}: {}",
                    output.display(),
                    e
                )))
            })?;
            export_successes(&checkpoint, BufWriter::new(file))?
        }
        None => export_successes(&checkpoint, std::io::stdout().lock())?,
    };

    info!(
        checkpoint = %path.display(),
        written,
        failed = checkpoint.failed(),
        "Exported successes"
    );
    Ok(())
}
