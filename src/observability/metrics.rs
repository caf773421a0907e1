//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): forwarded requests by method, status
//! - `proxy_request_duration_seconds` (histogram): upstream round trip
//! - `search_filter_responses_total` (counter): responses by filter outcome
//! - `search_filter_records_dropped_total` (counter): records removed

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one forwarded request.
pub fn record_request(method: &str, status: u16, start: Instant) {
    counter!(
        "proxy_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("proxy_request_duration_seconds", "method" => method.to_string())
        .record(start.elapsed().as_secs_f64());
}

/// Record what the search filter did with one response.
pub fn record_filter_outcome(outcome: &'static str) {
    counter!("search_filter_responses_total", "outcome" => outcome).increment(1);
}

/// Record records removed from a search response.
pub fn record_records_dropped(count: usize) {
    if count > 0 {
        counter!("search_filter_records_dropped_total").increment(count as u64);
    }
}
