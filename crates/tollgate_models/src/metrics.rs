//! Metrics for remote API calls.
//!
//! Provides OpenTelemetry-based metrics for tracking API latency, errors and
//! token usage per provider and model.

use opentelemetry::{
    KeyValue, global,
    metrics::{Counter, Histogram, Meter},
};
use std::sync::OnceLock;
use tollgate_error::ApiErrorKind;

static METRICS: OnceLock<ApiMetrics> = OnceLock::new();

/// Metrics for remote API interactions.
///
/// Labeled with provider (openai, ...) and model name.
#[derive(Clone)]
pub struct ApiMetrics {
    /// Meter handle kept alive for metric instruments
    _meter: Meter,
    /// Successful API calls
    pub requests: Counter<u64>,
    /// Failed API calls
    pub errors: Counter<u64>,
    /// API call duration in seconds
    pub duration: Histogram<f64>,
    /// Total tokens used (prompt + completion)
    pub tokens_used: Counter<u64>,
    /// Prompt tokens used
    pub prompt_tokens: Counter<u64>,
    /// Completion tokens used
    pub completion_tokens: Counter<u64>,
}

impl ApiMetrics {
    fn init() -> Self {
        let meter = global::meter("tollgate_models");

        Self {
            _meter: meter.clone(),
            requests: meter
                .u64_counter("api.requests")
                .with_description("Successful remote API calls")
                .build(),
            errors: meter
                .u64_counter("api.errors")
                .with_description("Failed remote API calls")
                .build(),
            duration: meter
                .f64_histogram("api.duration")
                .with_unit("seconds")
                .with_description("Remote API call duration")
                .build(),
            tokens_used: meter
                .u64_counter("api.tokens")
                .with_description("Total tokens used (prompt + completion)")
                .build(),
            prompt_tokens: meter
                .u64_counter("api.tokens.prompt")
                .with_description("Prompt tokens used")
                .build(),
            completion_tokens: meter
                .u64_counter("api.tokens.completion")
                .with_description("Completion tokens used")
                .build(),
        }
    }

    /// Get the global API metrics instance.
    pub fn get() -> &'static Self {
        METRICS.get_or_init(Self::init)
    }

    /// Record a successful call.
    pub fn record_request(&self, provider: &str, model: &str, duration_secs: f64) {
        let labels = &[
            KeyValue::new("provider", provider.to_string()),
            KeyValue::new("model", model.to_string()),
        ];
        self.requests.add(1, labels);
        self.duration.record(duration_secs, labels);
    }

    /// Record a failed call.
    pub fn record_error(&self, provider: &str, model: &str, error: &ApiErrorKind) {
        let labels = &[
            KeyValue::new("provider", provider.to_string()),
            KeyValue::new("model", model.to_string()),
            KeyValue::new("error_type", classify_error(error)),
        ];
        self.errors.add(1, labels);
    }

    /// Record token usage from a response.
    pub fn record_tokens(
        &self,
        model: &str,
        prompt_tokens: u64,
        completion_tokens: u64,
        total_tokens: u64,
    ) {
        let labels = &[KeyValue::new("model", model.to_string())];
        self.tokens_used.add(total_tokens, labels);
        self.prompt_tokens.add(prompt_tokens, labels);
        self.completion_tokens.add(completion_tokens, labels);
    }
}

impl Default for ApiMetrics {
    fn default() -> Self {
        Self::get().clone()
    }
}

/// Classify an API error for metrics labeling.
///
/// Returns one of: "rate_limit", "auth", "network", "timeout",
/// "invalid_request", "server", "decode".
pub fn classify_error(error: &ApiErrorKind) -> &'static str {
    match error {
        ApiErrorKind::MissingApiKey => "auth",
        ApiErrorKind::Http { status: 429, .. } => "rate_limit",
        ApiErrorKind::Http {
            status: 401 | 403, ..
        } => "auth",
        ApiErrorKind::Http { status, .. } if *status >= 500 => "server",
        ApiErrorKind::Http { .. } => "invalid_request",
        ApiErrorKind::Network(_) => "network",
        ApiErrorKind::Timeout(_) => "timeout",
        ApiErrorKind::Decode(_) => "decode",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_classify_error() {
        let http = |status| ApiErrorKind::Http {
            status,
            message: String::new(),
            retry_after: None,
        };
        assert_eq!(classify_error(&http(429)), "rate_limit");
        assert_eq!(classify_error(&http(401)), "auth");
        assert_eq!(classify_error(&http(503)), "server");
        assert_eq!(classify_error(&http(400)), "invalid_request");
        assert_eq!(
            classify_error(&ApiErrorKind::Timeout(Duration::from_secs(1))),
            "timeout"
        );
        assert_eq!(classify_error(&ApiErrorKind::MissingApiKey), "auth");
    }
}
