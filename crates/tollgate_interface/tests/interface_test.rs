use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tollgate_core::{Job, JobPayload, Priority, RequestKind, ResponsePayload, Usage};
use tollgate_error::{ApiError, ApiErrorKind};
use tollgate_interface::{ApiRequest, ApiResponse, InferenceBackend};

struct EchoBackend {
    calls: AtomicUsize,
}

#[async_trait]
impl InferenceBackend for EchoBackend {
    async fn call(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if request.text().is_empty() {
            return Err(ApiError::http(400, "empty input"));
        }
        Ok(ApiResponse::new(
            ResponsePayload::Completion {
                text: request.text().to_uppercase(),
            },
            Usage::new(request.text().len() as u64, 1),
        ))
    }

    fn provider_name(&self) -> &'static str {
        "echo"
    }
}

fn job(kind: RequestKind) -> Job {
    let payload = JobPayload::builder()
        .model("gpt-4o-mini")
        .text("claim one")
        .system_prompt("Be brief.")
        .max_tokens(64u32)
        .estimated_tokens(3u64)
        .build()
        .unwrap();
    Job::new("US7654321B2", 2, kind, payload).with_priority(Priority::High)
}

#[test]
fn test_request_for_job_copies_payload() {
    let request = ApiRequest::for_job(&job(RequestKind::Completion));

    assert_eq!(request.model(), "gpt-4o-mini");
    assert_eq!(*request.kind(), RequestKind::Completion);
    assert_eq!(request.text(), "claim one");
    assert_eq!(request.system_prompt().as_deref(), Some("Be brief."));
    assert_eq!(*request.max_tokens(), Some(64));
}

#[test]
fn test_request_kind_follows_job_identity() {
    let request = ApiRequest::for_job(&job(RequestKind::Embedding));
    assert_eq!(*request.kind(), RequestKind::Embedding);
}

#[test]
fn test_builder_requires_text() {
    let result = ApiRequest::builder()
        .model("gpt-4o-mini")
        .kind(RequestKind::Completion)
        .build();
    assert!(result.is_err());
}

#[tokio::test]
async fn test_arc_backend_forwards_calls() {
    let backend = Arc::new(EchoBackend {
        calls: AtomicUsize::new(0),
    });
    let shared: Arc<dyn InferenceBackend> = backend.clone();

    let response = shared
        .call(&ApiRequest::for_job(&job(RequestKind::Completion)))
        .await
        .unwrap();
    let (payload, usage) = response.into_parts();

    assert_eq!(
        payload,
        ResponsePayload::Completion {
            text: "CLAIM ONE".to_string()
        }
    );
    assert_eq!(*usage.total_tokens(), 10);
    assert_eq!(shared.provider_name(), "echo");
    assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_backend_errors_pass_through() {
    let backend = EchoBackend {
        calls: AtomicUsize::new(0),
    };
    let request = ApiRequest::builder()
        .model("gpt-4o-mini")
        .kind(RequestKind::Completion)
        .text("")
        .build()
        .unwrap();

    let err = backend.call(&request).await.unwrap_err();
    assert_eq!(err.kind.status(), Some(400));
    assert!(matches!(err.kind, ApiErrorKind::Http { .. }));
}
