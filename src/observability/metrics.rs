//! Metrics collection and exposition.
//!
//! # Metrics
//! - `relay_requests_total` (counter): relayed requests by route, status
//! - `relay_request_duration_seconds` (histogram): end-to-end latency by route
//! - `relay_upstream_retries_total` (counter): backoff retries by route
//!
//! Recording is a no-op until `init_metrics` installs the Prometheus recorder.

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(route: &str, status: u16, start: Instant) {
    let route = route.to_string();
    metrics::counter!(
        "relay_requests_total",
        "route" => route.clone(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("relay_request_duration_seconds", "route" => route)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_retry(route: &str) {
    metrics::counter!("relay_upstream_retries_total", "route" => route.to_string()).increment(1);
}
