//! Batch run command handler.

use super::{RunArgs, checkpoint_path};
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tollgate::{
    BudgetConfig, ConfigError, Dispatcher, DocumentSegmenter, FileSystemCheckpointStore,
    OpenAIClient, ProgressEvent, QuotaTracker, ResultCollector, TokenCounter, TollgateConfig,
    TollgateResult, read_documents,
};
use tracing::{debug, info, warn};

/// Completed jobs between two progress lines.
const REPORT_EVERY: u64 = 100;

/// Dispatch every job of a document file that has no recorded result.
///
/// Jobs already recorded as succeeded are skipped. Jobs recorded as failed
/// are skipped too unless `--retry-failed` is given. Ctrl-C cancels the run:
/// in-flight calls finish and are recorded, everything else stays pending.
pub async fn run_batch(args: &RunArgs) -> TollgateResult<()> {
    let config = TollgateConfig::load()?;

    if args.provider != "openai" {
        return Err(ConfigError::new(format!(
            "No backend for provider '{}' (supported: openai)",
            args.provider
        ))
        .into());
    }

    let records = read_documents(&args.documents)?;
    let segmenter = DocumentSegmenter::new(TokenCounter::cl100k()?)
        .with_max_segment_tokens(args.max_segment_tokens);
    let jobs = segmenter.jobs_for_all(&records)?;

    // Budget priority: CLI > config file > full quota
    let budget = {
        let mut overrides = BudgetConfig::builder();
        if let Some(rpm) = args.rpm_multiplier {
            overrides = overrides.rpm_multiplier(rpm);
        }
        if let Some(tpm) = args.tpm_multiplier {
            overrides = overrides.tpm_multiplier(tpm);
        }
        let budget = config.budget_or_default().merge(&overrides.build());
        budget.validate()?;

        if *budget.rpm_multiplier() < 1.0 || *budget.tpm_multiplier() < 1.0 {
            info!(
                rpm = budget.rpm_multiplier(),
                tpm = budget.tpm_multiplier(),
                "Applying budget multipliers"
            );
        }
        budget
    };

    let tier = {
        let tier = config
            .get_tier(&args.provider, args.tier.as_deref())
            .ok_or_else(|| {
                ConfigError::new(format!(
                    "No tier '{}' for provider '{}'",
                    args.tier.as_deref().unwrap_or("default"),
                    args.provider
                ))
            })?;

        // Per-model limits apply when the whole run targets one model.
        let models: BTreeSet<&str> = records.iter().map(|r| r.model().as_str()).collect();
        match models.iter().next() {
            Some(model) if models.len() == 1 => tier.for_model(model),
            _ => tier,
        }
    };
    info!(
        tier = %tier.name,
        rpm = ?tier.rpm,
        tpm = ?tier.tpm,
        rpd = ?tier.rpd,
        "Using quota tier"
    );

    let tracker = Arc::new(QuotaTracker::from_tier(&tier, &budget));

    let mut dispatch = config.dispatch_for(&tier);
    if let Some(concurrency) = args.concurrency {
        dispatch = dispatch.with_concurrency(concurrency);
    }

    let path = checkpoint_path(&config, args.checkpoint.as_ref());
    let store = FileSystemCheckpointStore::new(&path)?;
    let collector = Arc::new(ResultCollector::open(store, &config.checkpoint).await?);

    let total = jobs.len();
    let selected: Vec<_> = if args.retry_failed {
        collector.pending(jobs).await.collect()
    } else {
        collector.untouched(jobs).await.collect()
    };
    info!(
        checkpoint = %path.display(),
        total,
        selected = selected.len(),
        retry_failed = args.retry_failed,
        "Resuming from checkpoint"
    );

    let mut client = OpenAIClient::new()?.with_quota_tracker(Arc::clone(&tracker));
    if let Some(base_url) = &args.base_url {
        client = client.with_base_url(base_url.clone());
    }

    let dispatcher = Dispatcher::new(
        Arc::new(client),
        tracker,
        Arc::clone(&collector),
        &dispatch,
        &config.retry,
    )?;

    let reporter = tokio::spawn(report_progress(dispatcher.subscribe()));
    let interrupt = {
        let cancel = dispatcher.cancel_handle();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, finishing in-flight calls");
                cancel.cancel();
            }
        })
    };

    dispatcher.submit_all(selected);
    let result = dispatcher.drain().await;
    interrupt.abort();
    reporter.abort();
    let summary = result?;

    println!("\nRun Summary:");
    println!("============");
    println!("Jobs submitted: {}", summary.submitted());
    println!("Succeeded: {}", summary.succeeded());
    println!("Failed: {}", summary.failed());
    println!("Unfinished: {}", summary.unfinished());
    println!("Remote calls: {}", summary.calls());
    println!("Retries: {}", summary.retries());
    println!("Tokens: {}", summary.tokens());
    println!("Elapsed: {:.1}s", summary.elapsed().as_secs_f64());
    if *summary.cancelled() {
        println!("Cancelled: re-run the same command to resume");
    }
    println!("Checkpoint: {}", path.display());
    println!();

    Ok(())
}

async fn report_progress(mut events: tokio::sync::broadcast::Receiver<ProgressEvent>) {
    loop {
        match events.recv().await {
            Ok(event) => {
                debug!(job_id = %event.job_id(), success = event.success(), "Progress");
                if event.completed() % REPORT_EVERY == 0 {
                    info!(
                        completed = event.completed(),
                        succeeded = event.succeeded(),
                        failed = event.failed(),
                        tokens = event.cumulative_tokens(),
                        jobs_per_sec = format!("{:.2}", event.rate()),
                        "Progress"
                    );
                }
            }
            Err(RecvError::Lagged(skipped)) => debug!(skipped, "Progress reporter lagged"),
            Err(RecvError::Closed) => break,
        }
    }
}
