//! Metrics for the dispatcher.

use opentelemetry::{
    KeyValue, global,
    metrics::{Counter, Histogram, Meter},
};
use std::sync::OnceLock;

static METRICS: OnceLock<DispatchMetrics> = OnceLock::new();

/// Job-level dispatch metrics, labeled by request kind.
#[derive(Clone)]
pub struct DispatchMetrics {
    /// Meter handle kept alive for metric instruments
    _meter: Meter,
    /// Jobs recorded as succeeded
    pub succeeded: Counter<u64>,
    /// Jobs recorded as failed
    pub failed: Counter<u64>,
    /// Attempts re-queued after a recoverable failure
    pub retries: Counter<u64>,
    /// Server rate limits that throttled admission
    pub throttles: Counter<u64>,
    /// Remote call duration including timeouts, in seconds
    pub call_duration: Histogram<f64>,
}

impl DispatchMetrics {
    fn init() -> Self {
        let meter = global::meter("tollgate_dispatch");

        Self {
            _meter: meter.clone(),
            succeeded: meter
                .u64_counter("dispatch.jobs.succeeded")
                .with_description("Jobs recorded as succeeded")
                .build(),
            failed: meter
                .u64_counter("dispatch.jobs.failed")
                .with_description("Jobs recorded as failed")
                .build(),
            retries: meter
                .u64_counter("dispatch.retries")
                .with_description("Attempts re-queued after a recoverable failure")
                .build(),
            throttles: meter
                .u64_counter("dispatch.throttles")
                .with_description("Server rate limits that throttled admission")
                .build(),
            call_duration: meter
                .f64_histogram("dispatch.call.duration")
                .with_unit("seconds")
                .with_description("Remote call duration")
                .build(),
        }
    }

    /// Get the global dispatch metrics instance.
    pub fn get() -> &'static Self {
        METRICS.get_or_init(Self::init)
    }

    /// Record a terminal job.
    pub fn record_terminal(&self, kind: &str, success: bool, reason: Option<&str>) {
        let mut labels = vec![KeyValue::new("kind", kind.to_string())];
        if success {
            self.succeeded.add(1, &labels);
        } else {
            if let Some(reason) = reason {
                labels.push(KeyValue::new("reason", reason.to_string()));
            }
            self.failed.add(1, &labels);
        }
    }

    /// Record a re-queued attempt.
    pub fn record_retry(&self, kind: &str, reason: &str) {
        let labels = &[
            KeyValue::new("kind", kind.to_string()),
            KeyValue::new("reason", reason.to_string()),
        ];
        self.retries.add(1, labels);
    }

    /// Record a server-imposed throttle.
    pub fn record_throttle(&self, kind: &str) {
        self.throttles
            .add(1, &[KeyValue::new("kind", kind.to_string())]);
    }

    /// Record how long a call took.
    pub fn record_call(&self, kind: &str, duration_secs: f64) {
        self.call_duration
            .record(duration_secs, &[KeyValue::new("kind", kind.to_string())]);
    }
}

impl Default for DispatchMetrics {
    fn default() -> Self {
        Self::get().clone()
    }
}
