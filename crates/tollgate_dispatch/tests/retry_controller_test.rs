use std::time::Duration;
use tollgate_core::{
    Outcome, PermanentReason, RecoverableReason, ResponsePayload, RetryConfig, Usage,
};
use tollgate_dispatch::{Decision, RetryController};
use tollgate_error::{ApiError, ApiErrorKind};
use tollgate_interface::ApiResponse;

fn http(status: u16, message: &str) -> ApiError {
    ApiError::new(ApiErrorKind::Http {
        status,
        message: message.to_string(),
        retry_after: None,
    })
}

fn controller(jitter: bool) -> RetryController {
    RetryController::new(
        RetryConfig::default()
            .with_max_attempts(5)
            .with_base_delay_ms(1_000)
            .with_max_delay_ms(5_000)
            .with_jitter(jitter),
    )
}

fn recoverable(retry_after: Option<Duration>) -> Outcome {
    Outcome::Recoverable {
        reason: RecoverableReason::ServerError,
        message: "503".to_string(),
        retry_after,
    }
}

fn recoverable_reason(error: ApiError) -> RecoverableReason {
    match RetryController::outcome_of(Err(error)) {
        Outcome::Recoverable { reason, .. } => reason,
        other => panic!("Expected recoverable outcome, got {:?}", other),
    }
}

fn permanent_reason(error: ApiError) -> PermanentReason {
    match RetryController::outcome_of(Err(error)) {
        Outcome::Permanent { reason, .. } => reason,
        other => panic!("Expected permanent outcome, got {:?}", other),
    }
}

#[test]
fn test_outcome_of_success_keeps_response_and_usage() {
    let response = ApiResponse::new(
        ResponsePayload::Completion {
            text: "done".to_string(),
        },
        Usage::new(3, 4),
    );
    match RetryController::outcome_of(Ok(response)) {
        Outcome::Success { response, usage } => {
            assert_eq!(
                response,
                ResponsePayload::Completion {
                    text: "done".to_string()
                }
            );
            assert_eq!(*usage.total_tokens(), 7);
        }
        other => panic!("Expected success, got {:?}", other),
    }
}

#[test]
fn test_outcome_of_recoverable_errors() {
    assert_eq!(
        recoverable_reason(http(429, "slow down")),
        RecoverableReason::RateLimited
    );
    assert_eq!(
        recoverable_reason(http(408, "request timeout")),
        RecoverableReason::TransientNetwork
    );
    assert_eq!(
        recoverable_reason(ApiError::new(ApiErrorKind::Network("reset".to_string()))),
        RecoverableReason::TransientNetwork
    );
    assert_eq!(
        recoverable_reason(ApiError::new(ApiErrorKind::Timeout(Duration::from_secs(60)))),
        RecoverableReason::TransientNetwork
    );
    for status in [500, 502, 503, 504] {
        assert_eq!(
            recoverable_reason(http(status, "upstream")),
            RecoverableReason::ServerError
        );
    }
}

#[test]
fn test_outcome_of_permanent_errors() {
    assert_eq!(
        permanent_reason(http(401, "bad key")),
        PermanentReason::Authentication
    );
    assert_eq!(
        permanent_reason(http(403, "forbidden")),
        PermanentReason::Authentication
    );
    assert_eq!(
        permanent_reason(ApiError::new(ApiErrorKind::MissingApiKey)),
        PermanentReason::Authentication
    );
    assert_eq!(
        permanent_reason(http(400, "rejected [content_policy_violation]")),
        PermanentReason::ContentPolicy
    );
    assert_eq!(
        permanent_reason(http(400, "maximum context length exceeded")),
        PermanentReason::InvalidRequest
    );
    assert_eq!(
        permanent_reason(http(404, "no such model")),
        PermanentReason::InvalidRequest
    );
}

#[test]
fn test_outcome_of_carries_server_hint() {
    let error = ApiError::new(ApiErrorKind::Http {
        status: 429,
        message: "slow down".to_string(),
        retry_after: Some(Duration::from_secs(7)),
    });
    match RetryController::outcome_of(Err(error)) {
        Outcome::Recoverable { retry_after, .. } => {
            assert_eq!(retry_after, Some(Duration::from_secs(7)));
        }
        other => panic!("Expected recoverable outcome, got {:?}", other),
    }
}

#[test]
fn test_delay_doubles_up_to_cap() {
    let retry = controller(false);
    let delays: Vec<u128> = (1..=5)
        .map(|attempt| retry.delay(attempt, None).as_millis())
        .collect();
    assert_eq!(delays, vec![1_000, 2_000, 4_000, 5_000, 5_000]);
}

#[test]
fn test_delay_survives_huge_attempt_counts() {
    assert_eq!(
        controller(false).delay(u32::MAX, None),
        Duration::from_millis(5_000)
    );
}

#[test]
fn test_jittered_delay_stays_in_upper_half() {
    let retry = controller(true);
    for _ in 0..100 {
        let delay = retry.delay(2, None);
        assert!(delay >= Duration::from_millis(1_000), "{:?}", delay);
        assert!(delay <= Duration::from_millis(2_000), "{:?}", delay);
    }
}

#[test]
fn test_server_hint_raises_delay_within_cap() {
    let retry = controller(false);
    assert_eq!(
        retry.delay(1, Some(Duration::from_secs(3))),
        Duration::from_secs(3)
    );
    assert_eq!(
        retry.delay(3, Some(Duration::from_millis(10))),
        Duration::from_secs(4)
    );
    assert_eq!(
        retry.delay(1, Some(Duration::from_secs(600))),
        Duration::from_secs(5)
    );
}

#[test]
fn test_classify() {
    let retry = controller(false);
    let success = Outcome::Success {
        response: ResponsePayload::Embedding {
            vector: vec![0.5, 0.25],
        },
        usage: Usage::new(2, 0),
    };
    let permanent = Outcome::Permanent {
        reason: PermanentReason::InvalidRequest,
        message: "bad".to_string(),
    };

    assert_eq!(retry.classify(&success, 1), Decision::Success);
    assert_eq!(retry.classify(&permanent, 1), Decision::Abandon);
    assert_eq!(
        retry.classify(&recoverable(None), 1),
        Decision::RetryAfter(Duration::from_secs(1))
    );
    assert_eq!(
        retry.classify(&recoverable(None), 4),
        Decision::RetryAfter(Duration::from_secs(5))
    );
    assert_eq!(retry.classify(&recoverable(None), 5), Decision::Abandon);
}
