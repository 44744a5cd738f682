//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by route, status
//! - `gateway_request_duration_seconds` (histogram): time to response head
//! - `gateway_cgi_duration_seconds` (histogram): CGI process run time by route
//! - `gateway_reloads_total` (counter): reload attempts by result
//! - `gateway_hijack_sessions_active` (gauge): live upgraded sessions
//!
//! Without an installed recorder every call is a no-op.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter serving on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(route: &str, status: u16, start: Instant) {
    let labels = [
        ("route", route.to_string()),
        ("status", status.to_string()),
    ];
    counter!("gateway_requests_total", &labels).increment(1);
    histogram!("gateway_request_duration_seconds", &labels).record(start.elapsed().as_secs_f64());
}

pub fn record_cgi_duration(route: &str, start: Instant) {
    histogram!("gateway_cgi_duration_seconds", "route" => route.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_reload(success: bool) {
    let result = if success { "ok" } else { "error" };
    counter!("gateway_reloads_total", "result" => result).increment(1);
}

pub fn hijack_session_opened() {
    gauge!("gateway_hijack_sessions_active").increment(1.0);
}

pub fn hijack_session_closed() {
    gauge!("gateway_hijack_sessions_active").decrement(1.0);
}
