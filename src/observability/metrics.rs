//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define gateway metrics (dispatch outcomes, latency, timeouts, node links)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `gateway_dispatch_total` (counter): dispatched calls by namespace, method, outcome
//! - `gateway_dispatch_duration_seconds` (histogram): dispatch latency
//! - `gateway_dispatch_timeouts_total` (counter): calls that hit their deadline
//! - `gateway_node_connected` (gauge): 1=connection established, 0=setup failed
//! - `gateway_http_requests_total` (counter): responses by route and status
//!
//! Recording is a no-op until a recorder is installed, so tests need no setup.

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

/// Install the Prometheus recorder and its HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_dispatch(namespace: &'static str, method: &str, ok: bool, started: Instant) {
    let outcome = if ok { "ok" } else { "error" };
    counter!(
        "gateway_dispatch_total",
        "namespace" => namespace,
        "method" => method.to_string(),
        "outcome" => outcome
    )
    .increment(1);
    histogram!(
        "gateway_dispatch_duration_seconds",
        "namespace" => namespace,
        "method" => method.to_string()
    )
    .record(started.elapsed().as_secs_f64());
}

pub fn record_timeout(method: &str) {
    counter!("gateway_dispatch_timeouts_total", "method" => method.to_string()).increment(1);
}

pub fn record_node_connected(endpoint: &str, connected: bool) {
    gauge!("gateway_node_connected", "endpoint" => endpoint.to_string())
        .set(if connected { 1.0 } else { 0.0 });
}

pub fn record_http(route: &'static str, status: u16) {
    counter!("gateway_http_requests_total", "route" => route, "status" => status.to_string()).increment(1);
}
