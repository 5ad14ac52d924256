use crate::ApiMetrics;
use crate::openai::dto::{
    ChatRequest, ChatResponse, EmbeddingRequest, EmbeddingResponse, ErrorEnvelope,
};
use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::HeaderMap;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tollgate_core::RequestKind;
use tollgate_error::{ApiError, ApiErrorKind};
use tollgate_interface::{ApiRequest, ApiResponse, InferenceBackend};
use tollgate_rate_limit::{HeaderRateLimitDetector, QuotaTracker};
use tracing::{debug, error, instrument, warn};

/// Default OpenAI REST endpoint.
pub const OPENAI_API_URL: &str = "https://api.openai.com/v1";

const PROVIDER: &str = "openai";

/// OpenAI API client for chat completions and embeddings.
///
/// Each [`InferenceBackend::call`] is exactly one HTTP request. When a
/// [`QuotaTracker`] is attached, the `x-ratelimit-*` headers of every
/// response are fed back into it.
#[derive(Debug, Clone)]
pub struct OpenAIClient {
    client: Client,
    api_key: String,
    base_url: String,
    detector: HeaderRateLimitDetector,
    tracker: Option<Arc<QuotaTracker>>,
}

impl OpenAIClient {
    /// Creates a client with the key in `OPENAI_API_KEY`.
    ///
    /// # Errors
    ///
    /// Returns error if the variable is not set.
    pub fn new() -> Result<Self, ApiError> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| ApiError::new(ApiErrorKind::MissingApiKey))?;
        Ok(Self::with_api_key(api_key))
    }

    /// Creates a client with an explicit API key.
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        debug!("Creating new OpenAI client");
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: OPENAI_API_URL.to_string(),
            detector: HeaderRateLimitDetector::new(),
            tracker: None,
        }
    }

    /// Points the client at another OpenAI-compatible endpoint.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Feeds response rate-limit headers into `tracker`.
    pub fn with_quota_tracker(mut self, tracker: Arc<QuotaTracker>) -> Self {
        self.tracker = Some(tracker);
        self
    }

    /// Endpoint in use.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Header detector holding the most recently reported limits.
    pub fn detector(&self) -> &HeaderRateLimitDetector {
        &self.detector
    }

    #[instrument(skip(self, body))]
    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R, ApiError>
    where
        B: Serialize + Sync,
        R: DeserializeOwned + Send,
    {
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), path);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                error!(error = ?e, "Failed to send request to OpenAI API");
                ApiError::new(ApiErrorKind::Network(e.to_string()))
            })?;

        self.observe_limits(response.headers()).await;

        let status = response.status();
        if !status.is_success() {
            let retry_after = retry_after(response.headers());
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, ?retry_after, "OpenAI API returned error");
            return Err(error_from_status(status.as_u16(), &body, retry_after));
        }

        response.json::<R>().await.map_err(|e| {
            error!(error = ?e, "Failed to parse OpenAI response");
            ApiError::new(ApiErrorKind::Decode(e.to_string()))
        })
    }

    async fn observe_limits(&self, headers: &HeaderMap) {
        let Some(tracker) = &self.tracker else {
            return;
        };
        if let Some(limits) = self.detector.detect_openai(headers).await {
            self.detector.apply(tracker, &limits);
        }
    }
}

#[async_trait]
impl InferenceBackend for OpenAIClient {
    #[instrument(skip(self, request), fields(provider = PROVIDER, model = %request.model(), kind = %request.kind()))]
    async fn call(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
        let started = Instant::now();
        let result = match request.kind() {
            RequestKind::Completion => {
                let body = ChatRequest::from(request);
                self.post::<_, ChatResponse>("chat/completions", &body)
                    .await
                    .and_then(ApiResponse::try_from)
            }
            RequestKind::Embedding => {
                let body = EmbeddingRequest::from(request);
                self.post::<_, EmbeddingResponse>("embeddings", &body)
                    .await
                    .and_then(ApiResponse::try_from)
            }
        };

        let metrics = ApiMetrics::get();
        match &result {
            Ok(response) => {
                let usage = response.usage();
                metrics.record_request(PROVIDER, request.model(), started.elapsed().as_secs_f64());
                metrics.record_tokens(
                    request.model(),
                    *usage.prompt_tokens(),
                    *usage.completion_tokens(),
                    *usage.total_tokens(),
                );
                debug!(total_tokens = usage.total_tokens(), "OpenAI call succeeded");
            }
            Err(e) => metrics.record_error(PROVIDER, request.model(), &e.kind),
        }
        result
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}

/// Builds the error for a non-success response.
///
/// The message is the `error.message` of an OpenAI error body, followed by
/// its `code` (or `type`) in brackets, or the raw body when it is not JSON.
pub fn error_from_status(status: u16, body: &str, retry_after: Option<Duration>) -> ApiError {
    let message = match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => match envelope.error.code.or(envelope.error.kind) {
            Some(code) => format!("{} [{}]", envelope.error.message, code),
            None => envelope.error.message,
        },
        Err(_) => body.to_string(),
    };

    ApiError::new(ApiErrorKind::Http {
        status,
        message,
        retry_after,
    })
}

/// Longest server-suggested delay honored.
pub const MAX_RETRY_AFTER: Duration = Duration::from_secs(60 * 60);

/// Server-suggested delay from `retry-after-ms` or `retry-after` (seconds),
/// capped at [`MAX_RETRY_AFTER`].
///
/// HTTP-date values are ignored.
pub fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    let header = |key: &str| -> Option<f64> {
        let value: f64 = headers.get(key)?.to_str().ok()?.trim().parse().ok()?;
        (value.is_finite() && value >= 0.0).then_some(value)
    };
    let seconds = |secs: f64| {
        Duration::try_from_secs_f64(secs.min(MAX_RETRY_AFTER.as_secs_f64())).ok()
    };

    header("retry-after-ms")
        .and_then(|ms| seconds(ms / 1000.0))
        .or_else(|| header("retry-after").and_then(seconds))
}
