//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_admissions_total` (counter): admission outcomes by `outcome`
//! - `gateway_options_cache_total` (counter): cache lookups by `result`
//! - `gateway_options_cache_entries` (gauge): cached application groups
//! - `gateway_requests_total` (counter): proxied requests by method, status
//! - `gateway_request_duration_seconds` (histogram): end-to-end latency
//!
//! Recording functions are cheap no-ops until a recorder is installed, so
//! library code and tests call them unconditionally.

use std::net::SocketAddr;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("failed to install Prometheus exporter: {0}")]
    Install(String),
}

/// Install the Prometheus exporter with an HTTP listener on `addr`.
///
/// The listener is spawned onto the current Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), MetricsError> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| MetricsError::Install(e.to_string()))?;

    describe_counter!("gateway_admissions_total", "Admission outcomes");
    describe_counter!("gateway_options_cache_total", "Pool options cache lookups");
    describe_gauge!("gateway_options_cache_entries", "Cached application groups");
    describe_counter!("gateway_requests_total", "Requests handled by the gateway");
    describe_histogram!(
        "gateway_request_duration_seconds",
        "Request duration in seconds"
    );

    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_admission(outcome: &'static str) {
    counter!("gateway_admissions_total", "outcome" => outcome).increment(1);
}

pub fn record_options_cache(hit: bool) {
    let result = if hit { "hit" } else { "miss" };
    counter!("gateway_options_cache_total", "result" => result).increment(1);
}

pub fn record_options_cache_size(entries: usize) {
    gauge!("gateway_options_cache_entries").set(entries as f64);
}

/// Record a completed request.
pub fn record_request(method: &str, status: u16, duration: Duration) {
    counter!(
        "gateway_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("gateway_request_duration_seconds").record(duration.as_secs_f64());
}
