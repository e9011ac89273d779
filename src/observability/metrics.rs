//! Metrics collection and exposition.
//!
//! # Metrics
//! - `image_proxy_requests_total` (counter): requests by outcome, status
//! - `image_proxy_request_duration_seconds` (histogram): time to response headers
//! - `image_proxy_candidate_failures_total` (counter): rejected candidates by reason
//! - `image_proxy_bytes_streamed_total` (counter): image bytes forwarded
//! - `image_proxy_streams_aborted_total` (counter): streams cut short by reason
//!
//! Recording is a no-op until [`init_metrics`] installs the Prometheus recorder.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(outcome: &'static str, status: u16, start: Instant) {
    counter!(
        "image_proxy_requests_total",
        "outcome" => outcome,
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("image_proxy_request_duration_seconds", "outcome" => outcome)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_candidate_failure(reason: &'static str) {
    counter!("image_proxy_candidate_failures_total", "reason" => reason).increment(1);
}

pub fn record_bytes_streamed(bytes: u64) {
    counter!("image_proxy_bytes_streamed_total").increment(bytes);
}

pub fn record_stream_aborted(reason: &'static str) {
    counter!("image_proxy_streams_aborted_total", "reason" => reason).increment(1);
}
