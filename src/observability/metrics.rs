//! Metrics collection and exposition.
//!
//! # Metrics
//! - `switchyard_dispatch_total` (counter): dispatches by outcome
//!   (`ok`, `not_found`, `unauthorized`, `error`)
//! - `switchyard_dispatch_duration_seconds` (histogram): dispatch latency
//! - `switchyard_csrf_validations_total` (counter): CSRF checks by outcome
//!   (`valid`, `expired`, `unauthorized`)
//! - `switchyard_route_table_size` (gauge): compiled routes after expansion
//!
//! # Design Decisions
//! - Recording without an installed exporter is a no-op, so library users
//!   and tests pay nothing
//! - Prometheus exporter only starts when `metrics_enabled` is set

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_dispatch(outcome: &'static str, start: Instant) {
    metrics::counter!("switchyard_dispatch_total", "outcome" => outcome).increment(1);
    metrics::histogram!("switchyard_dispatch_duration_seconds", "outcome" => outcome)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_csrf(outcome: &'static str) {
    metrics::counter!("switchyard_csrf_validations_total", "outcome" => outcome).increment(1);
}

pub fn record_route_table_size(size: usize) {
    metrics::gauge!("switchyard_route_table_size").set(size as f64);
}
