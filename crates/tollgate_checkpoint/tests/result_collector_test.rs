//! Tests for result collection semantics.

use std::time::Duration;
use tollgate_checkpoint::{
    Checkpoint, CheckpointEntry, MemoryCheckpointStore, RecordStatus, ResultCollector,
};
use tollgate_core::{
    CheckpointConfig, Job, JobId, JobPayload, Outcome, PermanentReason, RecoverableReason,
    RequestKind, ResponsePayload, Usage,
};

fn job(doc: &str) -> Job {
    let payload = JobPayload::builder()
        .model("text-embedding-3-small")
        .text(format!("abstract of {}", doc))
        .estimated_tokens(5u64)
        .build()
        .unwrap();
    Job::new(doc, 0, RequestKind::Embedding, payload)
}

fn success(value: f32) -> Outcome {
    Outcome::Success {
        response: ResponsePayload::Embedding {
            vector: vec![value],
        },
        usage: Usage::new(5, 0),
    }
}

fn permanent() -> Outcome {
    Outcome::Permanent {
        reason: PermanentReason::ContentPolicy,
        message: "flagged".to_string(),
    }
}

fn config(every_completions: usize, every_secs: u64) -> CheckpointConfig {
    CheckpointConfig::default()
        .with_every_completions(every_completions)
        .with_every_secs(every_secs)
}

async fn collector(store: &MemoryCheckpointStore, config: &CheckpointConfig) -> ResultCollector {
    ResultCollector::open(store.clone(), config).await.unwrap()
}

#[tokio::test]
async fn test_recording_same_success_twice_is_unchanged() {
    let store = MemoryCheckpointStore::new();
    let collector = collector(&store, &config(100, 600)).await;
    let id = JobId::new("US1", 0, RequestKind::Embedding);

    assert_eq!(
        collector.record(&id, &success(1.0), 1).await.unwrap(),
        RecordStatus::Recorded
    );
    assert_eq!(
        collector.record(&id, &success(2.0), 2).await.unwrap(),
        RecordStatus::Unchanged
    );

    let successes = collector.successes().await;
    assert_eq!(
        successes[&id],
        ResponsePayload::Embedding { vector: vec![1.0] }
    );
}

#[tokio::test]
async fn test_failure_never_overwrites_success() {
    let store = MemoryCheckpointStore::new();
    let collector = collector(&store, &config(100, 600)).await;
    let id = JobId::new("US1", 0, RequestKind::Embedding);

    collector.record(&id, &success(1.0), 1).await.unwrap();
    assert_eq!(
        collector.record(&id, &permanent(), 1).await.unwrap(),
        RecordStatus::Rejected
    );

    assert!(collector.checkpoint().await.is_succeeded(&id));
}

#[tokio::test]
async fn test_success_replaces_failure() {
    let store = MemoryCheckpointStore::new();
    let collector = collector(&store, &config(100, 600)).await;
    let id = JobId::new("US1", 0, RequestKind::Embedding);

    collector.record(&id, &permanent(), 1).await.unwrap();
    assert_eq!(
        collector.record(&id, &success(3.0), 1).await.unwrap(),
        RecordStatus::Recorded
    );
    assert!(collector.checkpoint().await.is_succeeded(&id));
}

#[tokio::test]
async fn test_recoverable_outcome_recorded_as_exhausted() {
    let store = MemoryCheckpointStore::new();
    let collector = collector(&store, &config(100, 600)).await;
    let id = JobId::new("US1", 0, RequestKind::Embedding);

    let outcome = Outcome::Recoverable {
        reason: RecoverableReason::ServerError,
        message: "503 Service Unavailable".to_string(),
        retry_after: None,
    };
    collector.record(&id, &outcome, 5).await.unwrap();

    let checkpoint = collector.checkpoint().await;
    match checkpoint.get(&id).unwrap() {
        CheckpointEntry::Failed {
            reason,
            message,
            attempts,
            ..
        } => {
            assert_eq!(*reason, PermanentReason::RetriesExhausted);
            assert!(message.contains("503"));
            assert_eq!(*attempts, 5);
        }
        other => panic!("expected failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_snapshot_cadence_by_count() {
    let store = MemoryCheckpointStore::new();
    let collector = collector(&store, &config(2, 600)).await;

    collector
        .record(&JobId::new("US1", 0, RequestKind::Embedding), &success(1.0), 1)
        .await
        .unwrap();
    assert_eq!(store.writes(), 0);

    collector
        .record(&JobId::new("US2", 0, RequestKind::Embedding), &success(1.0), 1)
        .await
        .unwrap();
    assert_eq!(store.writes(), 1);
    assert_eq!(store.latest().unwrap().records().len(), 2);

    // Unchanged records do not count towards the cadence.
    collector
        .record(&JobId::new("US2", 0, RequestKind::Embedding), &success(1.0), 1)
        .await
        .unwrap();
    assert_eq!(store.writes(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_snapshot_cadence_by_time() {
    let store = MemoryCheckpointStore::new();
    let collector = collector(&store, &config(1_000, 30)).await;

    collector
        .record(&JobId::new("US1", 0, RequestKind::Embedding), &success(1.0), 1)
        .await
        .unwrap();
    assert_eq!(store.writes(), 0);

    tokio::time::advance(Duration::from_secs(31)).await;
    collector
        .record(&JobId::new("US2", 0, RequestKind::Embedding), &success(1.0), 1)
        .await
        .unwrap();
    assert_eq!(store.writes(), 1);
}

#[tokio::test]
async fn test_pending_skips_successes_and_keeps_order() {
    let store = MemoryCheckpointStore::new();
    let collector = collector(&store, &config(100, 600)).await;
    let jobs: Vec<Job> = ["US1", "US2", "US3", "US4"].into_iter().map(job).collect();

    collector.record(jobs[1].id(), &success(1.0), 1).await.unwrap();
    collector.record(jobs[2].id(), &permanent(), 1).await.unwrap();

    let pending: Vec<String> = collector
        .pending(jobs.clone())
        .await
        .map(|j| j.id().document_id().clone())
        .collect();
    assert_eq!(pending, vec!["US1", "US3", "US4"]);

    let untouched: Vec<String> = collector
        .untouched(jobs)
        .await
        .map(|j| j.id().document_id().clone())
        .collect();
    assert_eq!(untouched, vec!["US1", "US4"]);
}

#[tokio::test]
async fn test_open_resumes_from_store() {
    let prior = MemoryCheckpointStore::new();
    {
        let collector = collector(&prior, &config(100, 600)).await;
        collector
            .record(&JobId::new("US1", 0, RequestKind::Embedding), &success(1.0), 1)
            .await
            .unwrap();
        collector.snapshot().await.unwrap();
    }

    let resumed = MemoryCheckpointStore::with_checkpoint(prior.latest().unwrap());
    let collector = collector(&resumed, &config(100, 600)).await;
    let pending: Vec<Job> = collector
        .pending(vec![job("US1"), job("US2")])
        .await
        .collect();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id().document_id(), "US2");
}

#[tokio::test]
async fn test_empty_store_starts_empty() {
    let store = MemoryCheckpointStore::with_checkpoint(Checkpoint::new());
    let collector = collector(&store, &config(100, 600)).await;
    assert!(collector.successes().await.is_empty());
}
