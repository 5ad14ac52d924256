//! Auto-detection of rate limits from API response headers.
//!
//! Header detection reflects the account's actual current limits, which may
//! be lower than the configured tier (new organisations, per-project caps).
//! Detected per-minute limits can only tighten the tracker, never loosen it.

use crate::{MINUTE, QuotaTracker, QuotaUnit};
use reqwest::header::HeaderMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

/// Limits reported by one response.
#[derive(Debug, Clone, PartialEq, Eq, Default, derive_getters::Getters)]
pub struct DetectedLimits {
    requests_limit: Option<u64>,
    tokens_limit: Option<u64>,
    requests_remaining: Option<u64>,
    tokens_remaining: Option<u64>,
    requests_reset: Option<Duration>,
    tokens_reset: Option<Duration>,
}

impl DetectedLimits {
    fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Detects and caches rate limits from API response headers.
///
/// # Example
///
/// ```rust,ignore
/// let detector = HeaderRateLimitDetector::new();
///
/// // After making an API call
/// if let Some(limits) = detector.detect_openai(response.headers()).await {
///     detector.apply(&tracker, &limits);
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct HeaderRateLimitDetector {
    detected_limits: Arc<RwLock<Option<DetectedLimits>>>,
}

impl HeaderRateLimitDetector {
    /// Create a new header rate limit detector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Detect rate limits from OpenAI response headers.
    ///
    /// OpenAI reports:
    /// - `x-ratelimit-limit-requests` / `x-ratelimit-limit-tokens`
    /// - `x-ratelimit-remaining-requests` / `x-ratelimit-remaining-tokens`
    /// - `x-ratelimit-reset-requests` / `x-ratelimit-reset-tokens` (e.g. `6m0s`, `20ms`)
    ///
    /// Returns `None` if the response carries none of them.
    #[instrument(skip(self, headers))]
    pub async fn detect_openai(&self, headers: &HeaderMap) -> Option<DetectedLimits> {
        let limits = DetectedLimits {
            requests_limit: parse_header_u64(headers, "x-ratelimit-limit-requests"),
            tokens_limit: parse_header_u64(headers, "x-ratelimit-limit-tokens"),
            requests_remaining: parse_header_u64(headers, "x-ratelimit-remaining-requests"),
            tokens_remaining: parse_header_u64(headers, "x-ratelimit-remaining-tokens"),
            requests_reset: parse_header_duration(headers, "x-ratelimit-reset-requests"),
            tokens_reset: parse_header_duration(headers, "x-ratelimit-reset-tokens"),
        };

        if limits.is_empty() {
            return None;
        }

        debug!(
            rpm = ?limits.requests_limit,
            tpm = ?limits.tokens_limit,
            remaining_requests = ?limits.requests_remaining,
            remaining_tokens = ?limits.tokens_remaining,
            "Detected OpenAI rate limits"
        );

        *self.detected_limits.write().await = Some(limits.clone());
        Some(limits)
    }

    /// Pushes detected limits into `tracker`.
    ///
    /// Per-minute capacities above the reported limits are lowered, and an
    /// exhausted bucket throttles admission until it resets.
    pub fn apply(&self, tracker: &QuotaTracker, limits: &DetectedLimits) {
        if let Some(rpm) = limits.requests_limit {
            tracker.tighten(QuotaUnit::Requests, MINUTE, rpm);
        }
        if let Some(tpm) = limits.tokens_limit {
            tracker.tighten(QuotaUnit::Tokens, MINUTE, tpm);
        }

        let exhausted = [
            (limits.requests_remaining, limits.requests_reset),
            (limits.tokens_remaining, limits.tokens_reset),
        ];
        for (remaining, reset) in exhausted {
            if let (Some(0), Some(reset)) = (remaining, reset) {
                tracker.throttle(reset);
            }
        }
    }

    /// Most recently detected limits.
    pub async fn get_cached(&self) -> Option<DetectedLimits> {
        self.detected_limits.read().await.clone()
    }

    /// Forget the cached limits.
    pub async fn clear_cache(&self) {
        *self.detected_limits.write().await = None;
    }
}

fn parse_header_u64(headers: &HeaderMap, key: &str) -> Option<u64> {
    headers.get(key)?.to_str().ok()?.trim().parse().ok()
}

fn parse_header_duration(headers: &HeaderMap, key: &str) -> Option<Duration> {
    parse_reset(headers.get(key)?.to_str().ok()?)
}

/// Parses Go-style durations as sent in reset headers: `1h2m3s`, `6m0s`,
/// `1.5s`, `20ms`.
pub fn parse_reset(value: &str) -> Option<Duration> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    let mut nanos = 0_u64;
    let mut rest = value;
    while !rest.is_empty() {
        let split = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        let (number, tail) = rest.split_at(split);
        let number: f64 = number.parse().ok()?;

        let unit_len = tail
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(tail.len());
        let (unit, tail) = tail.split_at(unit_len);
        let unit_nanos = match unit {
            "h" => 3_600e9,
            "m" => 60e9,
            "s" => 1e9,
            "ms" => 1e6,
            _ => return None,
        };

        nanos = nanos.saturating_add((number * unit_nanos).round() as u64);
        rest = tail;
    }

    Some(Duration::from_nanos(nanos))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_reset_formats() {
        assert_eq!(parse_reset("6m0s"), Some(Duration::from_secs(360)));
        assert_eq!(parse_reset("1.5s"), Some(Duration::from_millis(1500)));
        assert_eq!(parse_reset("20ms"), Some(Duration::from_millis(20)));
        assert_eq!(parse_reset("1h2m3s"), Some(Duration::from_secs(3723)));
    }

    #[test]
    fn test_parse_reset_rejects_garbage() {
        assert_eq!(parse_reset(""), None);
        assert_eq!(parse_reset("soon"), None);
        assert_eq!(parse_reset("5"), None);
    }
}
