use tollgate::{
    CheckpointConfig, CheckpointStore, ExportRecord, FileSystemCheckpointStore, JobId, Outcome,
    PermanentReason, RequestKind, ResponsePayload, ResultCollector, Usage, export_successes,
};

fn completion(text: &str) -> Outcome {
    Outcome::Success {
        response: ResponsePayload::Completion {
            text: text.to_string(),
        },
        usage: Usage::new(10, 5),
    }
}

#[tokio::test]
async fn test_export_writes_one_line_per_success() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileSystemCheckpointStore::new(dir.path().join("checkpoint.json")).unwrap();
    let collector = ResultCollector::open(store.clone(), &CheckpointConfig::default())
        .await
        .unwrap();

    let second = JobId::new("US2", 1, RequestKind::Completion);
    let first = JobId::new("US1", 0, RequestKind::Embedding);
    let failed = JobId::new("US3", 0, RequestKind::Completion);
    collector.record(&second, &completion("summary"), 1).await.unwrap();
    collector
        .record(
            &first,
            &Outcome::Success {
                response: ResponsePayload::Embedding {
                    vector: vec![0.5, -0.25],
                },
                usage: Usage::new(4, 0),
            },
            2,
        )
        .await
        .unwrap();
    collector
        .record(
            &failed,
            &Outcome::Permanent {
                reason: PermanentReason::ContentPolicy,
                message: "rejected".to_string(),
            },
            1,
        )
        .await
        .unwrap();
    collector.snapshot().await.unwrap();

    let checkpoint = store.load().await.unwrap().unwrap();
    let mut output = Vec::new();
    let written = export_successes(&checkpoint, &mut output).unwrap();
    assert_eq!(written, 2);

    let lines: Vec<ExportRecord> = String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(lines.len(), 2);

    // Ordered by job identity: "completion:..." sorts before "embedding:...".
    assert_eq!(lines[0].job_id, second);
    assert_eq!(lines[0].document_id, "US2");
    assert_eq!(lines[0].chunk_index, 1);
    assert_eq!(lines[0].kind, RequestKind::Completion);
    assert_eq!(
        lines[0].response,
        ResponsePayload::Completion {
            text: "summary".to_string()
        }
    );
    assert_eq!(lines[1].job_id, first);
    assert_eq!(lines[1].kind, RequestKind::Embedding);
}

#[tokio::test]
async fn test_export_line_format() {
    let collector = ResultCollector::open(
        tollgate::MemoryCheckpointStore::new(),
        &CheckpointConfig::default(),
    )
    .await
    .unwrap();
    let id = JobId::new("US7654321B2", 0, RequestKind::Completion);
    collector.record(&id, &completion("ok"), 1).await.unwrap();

    let mut output = Vec::new();
    export_successes(&collector.checkpoint().await, &mut output).unwrap();

    let value: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(value["job_id"], "completion:US7654321B2:0");
    assert_eq!(value["document_id"], "US7654321B2");
    assert_eq!(value["chunk_index"], 0);
    assert_eq!(value["kind"], "completion");
    assert_eq!(value["response"]["type"], "completion");
    assert_eq!(value["response"]["text"], "ok");
}

#[tokio::test]
async fn test_export_of_empty_checkpoint_writes_nothing() {
    let collector = ResultCollector::open(
        tollgate::MemoryCheckpointStore::new(),
        &CheckpointConfig::default(),
    )
    .await
    .unwrap();

    let mut output = Vec::new();
    let written = export_successes(&collector.checkpoint().await, &mut output).unwrap();
    assert_eq!(written, 0);
    assert!(output.is_empty());
}
