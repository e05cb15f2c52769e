//! Metrics collection and exposition.
//!
//! # Metrics
//! - `mock_requests_total` (counter): requests by method, status, matched
//! - `mock_request_duration_seconds` (histogram): dispatch latency, simulated delay included
//! - `mock_scan_routes` (gauge): routes in the latest scan
//! - `mock_scan_diagnostics_total` (counter): skip and failure events by code
//! - `mock_manifest_publishes_total` (counter): snapshot swaps
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed
//! - The Prometheus endpoint is opt-in through config

use std::net::SocketAddr;
use std::time::Duration;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::scan::diagnostics::Diagnostics;

/// Install the Prometheus recorder and serve `/metrics` on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_request(method: &str, status: u16, matched: bool, elapsed: Duration) {
    metrics::counter!(
        "mock_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "matched" => if matched { "true" } else { "false" },
    )
    .increment(1);
    metrics::histogram!("mock_request_duration_seconds").record(elapsed.as_secs_f64());
}

pub fn record_scan(routes: usize, diagnostics: &Diagnostics) {
    metrics::gauge!("mock_scan_routes").set(routes as f64);
    for diagnostic in diagnostics.iter() {
        metrics::counter!("mock_scan_diagnostics_total", "kind" => diagnostic.code()).increment(1);
    }
}

pub fn record_publish(routes: usize) {
    metrics::counter!("mock_manifest_publishes_total").increment(1);
    metrics::gauge!("mock_scan_routes").set(routes as f64);
}
