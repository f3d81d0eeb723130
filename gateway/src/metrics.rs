//! Prometheus metrics registry.
//!
//! Installs a global `metrics` recorder backed by
//! `metrics-exporter-prometheus`, the same combination the teacher's
//! `PrometheusMetrics` module uses, and exposes the handful of series the
//! gateway needs: request/batch latency histograms, a batch-size
//! histogram, the live queue-depth gauge, and rejection/timeout/predictor
//! error counters.

use std::sync::Once;
use std::time::Duration;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::warn;

const REQUEST_LATENCY: &str = "inference_request_latency_seconds";
const BATCH_SIZE: &str = "inference_batch_size";
const BATCH_LATENCY: &str = "inference_batch_latency_seconds";
const QUEUE_DEPTH: &str = "inference_queue_depth";
const QUEUE_REJECTIONS: &str = "inference_queue_rejections_total";
const REQUEST_TIMEOUTS: &str = "inference_request_timeouts_total";
const PREDICTOR_ERRORS: &str = "inference_predictor_errors_total";

static INIT: Once = Once::new();

/// Handle to the installed recorder plus the series names it owns. One
/// instance is constructed at startup and shared (via `Arc`) across the
/// HTTP handlers, admission middleware, and assembler.
pub struct Metrics {
    handle: Option<PrometheusHandle>,
}

impl Metrics {
    /// Installs the global Prometheus recorder with the exact bucket lists
    /// the external-interface contract fixes for each histogram, guarded so
    /// a second call in the same process (as happens across tests) doesn't
    /// panic the global install.
    pub fn install() -> Self {
        let mut handle = None;
        INIT.call_once(|| {
            let builder = PrometheusBuilder::new();
            let builder = match builder
                .set_buckets_for_metric(
                    metrics_exporter_prometheus::Matcher::Full(REQUEST_LATENCY.to_string()),
                    &[0.005, 0.01, 0.02, 0.05, 0.075, 0.1, 0.25, 0.5, 1.0],
                )
                .and_then(|b| {
                    b.set_buckets_for_metric(
                        metrics_exporter_prometheus::Matcher::Full(BATCH_SIZE.to_string()),
                        &[1.0, 2.0, 4.0, 8.0, 16.0, 32.0, 64.0],
                    )
                })
                .and_then(|b| {
                    b.set_buckets_for_metric(
                        metrics_exporter_prometheus::Matcher::Full(BATCH_LATENCY.to_string()),
                        &[0.001, 0.005, 0.01, 0.02, 0.05, 0.1, 0.25],
                    )
                }) {
                Ok(b) => b,
                Err(e) => {
                    warn!(error = %e, "failed to configure histogram buckets, using defaults");
                    PrometheusBuilder::new()
                }
            };

            match builder.install_recorder() {
                Ok(h) => handle = Some(h),
                Err(e) => warn!(error = %e, "failed to install prometheus recorder"),
            }
        });

        Metrics { handle }
    }

    /// A `Metrics` with no installed recorder; every `record_*` call is a
    /// no-op. Used by unit tests that don't want to touch process-global
    /// recorder state.
    pub fn new_noop() -> Self {
        Metrics { handle: None }
    }

    /// Renders the current state of every series in Prometheus text
    /// exposition format, for the `/metrics` endpoint.
    pub fn render(&self) -> String {
        match &self.handle {
            Some(handle) => handle.render(),
            None => String::new(),
        }
    }

    /// Records the end-to-end latency of a single `/predict` request.
    pub fn observe_request_latency(&self, elapsed: Duration) {
        histogram!(REQUEST_LATENCY).record(elapsed.as_secs_f64());
    }

    /// Records the size of a dispatched batch.
    pub fn observe_batch_size(&self, size: usize) {
        histogram!(BATCH_SIZE).record(size as f64);
    }

    /// Records the wall-clock time the predictor took to score a batch.
    pub fn observe_batch_latency(&self, elapsed: Duration) {
        histogram!(BATCH_LATENCY).record(elapsed.as_secs_f64());
    }

    /// Publishes the current intake queue occupancy.
    pub fn set_queue_depth(&self, depth: usize) {
        gauge!(QUEUE_DEPTH).set(depth as f64);
    }

    /// Increments the count of requests rejected by the admission
    /// middleware.
    pub fn record_queue_rejection(&self) {
        counter!(QUEUE_REJECTIONS).increment(1);
    }

    /// Increments the count of requests that tripped the deadline
    /// middleware.
    pub fn record_request_timeout(&self) {
        counter!(REQUEST_TIMEOUTS).increment(1);
    }

    /// Increments the count of batches that failed at the predictor.
    pub fn record_predictor_error(&self) {
        counter!(PREDICTOR_ERRORS).increment(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_metrics_render_empty() {
        let metrics = Metrics::new_noop();
        metrics.observe_request_latency(Duration::from_millis(5));
        metrics.set_queue_depth(10);
        metrics.record_queue_rejection();
        assert_eq!(metrics.render(), "");
    }
}
