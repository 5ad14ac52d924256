//! Test utilities for dispatcher tests.
//!
//! Provides a scripted backend, a store that always fails, and builders for
//! jobs and collectors.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use tollgate_checkpoint::{
    Checkpoint, CheckpointError, CheckpointErrorKind, CheckpointStore, MemoryCheckpointStore,
    ResultCollector,
};
use tollgate_core::{
    CheckpointConfig, DispatchConfig, Job, JobPayload, Priority, RequestKind, ResponsePayload,
    RetryConfig, Usage,
};
use tollgate_error::{ApiError, ApiErrorKind};
use tollgate_interface::{ApiRequest, ApiResponse, InferenceBackend};

/// One scripted reply.
#[derive(Debug, Clone)]
pub enum Reply {
    /// Succeed with the upper-cased input
    Complete,
    /// Fail with an HTTP status
    Status {
        status: u16,
        retry_after: Option<Duration>,
    },
    /// Never answer
    Hang,
    /// Panic inside the call
    Panic,
}

impl Reply {
    pub fn status(status: u16) -> Self {
        Reply::Status {
            status,
            retry_after: None,
        }
    }
}

/// A recorded call.
#[derive(Debug, Clone)]
pub struct Call {
    pub text: String,
    pub at: Instant,
}

#[derive(Default)]
struct Script {
    replies: VecDeque<Reply>,
    then: Option<Reply>,
}

/// Backend whose replies are scripted per request text.
///
/// Texts without a script always complete.
pub struct ScriptedBackend {
    scripts: Mutex<HashMap<String, Script>>,
    usage_tokens: u64,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::with_usage(10)
    }

    /// Successes report `tokens` prompt tokens.
    pub fn with_usage(tokens: u64) -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            usage_tokens: tokens,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Replies to `text` with `replies` in order, then completes.
    pub fn script(self, text: &str, replies: Vec<Reply>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .entry(text.to_string())
            .or_default()
            .replies
            .extend(replies);
        self
    }

    /// Replies to `text` with `reply` forever.
    pub fn always(self, text: &str, reply: Reply) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .entry(text.to_string())
            .or_default()
            .then = Some(reply);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls_for(&self, text: &str) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|call| call.text == text)
            .collect()
    }

    fn next_reply(&self, text: &str) -> Reply {
        let mut scripts = self.scripts.lock().unwrap();
        match scripts.get_mut(text) {
            Some(script) => script
                .replies
                .pop_front()
                .or_else(|| script.then.clone())
                .unwrap_or(Reply::Complete),
            None => Reply::Complete,
        }
    }
}

#[async_trait]
impl InferenceBackend for ScriptedBackend {
    async fn call(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
        self.calls.lock().unwrap().push(Call {
            text: request.text().clone(),
            at: Instant::now(),
        });

        match self.next_reply(request.text()) {
            Reply::Complete => Ok(ApiResponse::new(
                ResponsePayload::Completion {
                    text: request.text().to_uppercase(),
                },
                Usage::new(self.usage_tokens, 0),
            )),
            Reply::Status {
                status,
                retry_after,
            } => Err(ApiError::new(ApiErrorKind::Http {
                status,
                message: format!("scripted {}", status),
                retry_after,
            })),
            Reply::Panic => panic!("scripted backend panic"),
            Reply::Hang => {
                tokio::time::sleep(Duration::from_secs(86_400)).await;
                Err(ApiError::new(ApiErrorKind::Network("hung".to_string())))
            }
        }
    }

    fn provider_name(&self) -> &'static str {
        "scripted"
    }
}

/// Store whose writes always fail.
#[derive(Debug, Clone, Default)]
pub struct FailingStore;

#[async_trait]
impl CheckpointStore for FailingStore {
    async fn load(&self) -> Result<Option<Checkpoint>, CheckpointError> {
        Ok(None)
    }

    async fn persist(&self, _checkpoint: &Checkpoint) -> Result<(), CheckpointError> {
        Err(CheckpointError::new(CheckpointErrorKind::FileWrite(
            "disk full".to_string(),
        )))
    }
}

/// Request text used for the job of document `doc`.
pub fn text(doc: &str) -> String {
    format!("claims of {}", doc)
}

/// A completion job for `doc` estimated at `tokens` tokens.
pub fn job(doc: &str, tokens: u64) -> Job {
    let payload = JobPayload::builder()
        .model("gpt-4o-mini")
        .text(text(doc))
        .estimated_tokens(tokens)
        .build()
        .unwrap();
    Job::new(doc, 0, RequestKind::Completion, payload)
}

pub fn job_with_priority(doc: &str, priority: Priority) -> Job {
    job(doc, 10).with_priority(priority)
}

pub async fn memory_collector(store: &MemoryCheckpointStore) -> Arc<ResultCollector> {
    Arc::new(
        ResultCollector::open(store.clone(), &CheckpointConfig::default())
            .await
            .unwrap(),
    )
}

pub fn dispatch_config(concurrency: usize) -> DispatchConfig {
    DispatchConfig::default()
        .with_concurrency(concurrency)
        .with_call_timeout_secs(5)
}

/// Small deterministic backoff: 100ms doubling, capped at 1s.
pub fn retry_config(max_attempts: u32) -> RetryConfig {
    RetryConfig::default()
        .with_max_attempts(max_attempts)
        .with_base_delay_ms(100)
        .with_max_delay_ms(1_000)
        .with_jitter(false)
}
