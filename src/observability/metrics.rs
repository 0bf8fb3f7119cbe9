//! Metrics collection and exposition.
//!
//! # Metrics
//! - `lb_requests_total` (counter): requests by method and final status
//! - `lb_request_duration_seconds` (histogram): end-to-end latency incl. retries
//! - `lb_upstream_retries_total` (counter): same-backend retries by backend
//! - `lb_backend_demotions_total` (counter): backends marked down by the router
//! - `lb_backend_alive` (gauge): 1=alive, 0=down, set by health checks
//!
//! Recording is a no-op until [`init_metrics`] installs the exporter.

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and serve it on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    metrics::counter!(
        "lb_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("lb_request_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_retry(backend: &str) {
    metrics::counter!("lb_upstream_retries_total", "backend" => backend.to_string()).increment(1);
}

pub fn record_demotion(backend: &str) {
    metrics::counter!("lb_backend_demotions_total", "backend" => backend.to_string()).increment(1);
}

pub fn record_backend_health(backend: &str, alive: bool) {
    metrics::gauge!("lb_backend_alive", "backend" => backend.to_string())
        .set(if alive { 1.0 } else { 0.0 });
}
