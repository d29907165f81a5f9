//! Metrics collection and exposition.
//!
//! # Metrics
//! - `cors_proxy_requests_total{method,status,outcome}` (counter)
//! - `cors_proxy_request_duration_seconds{outcome}` (histogram)
//!
//! `outcome` is one of `info`, `forbidden`, `preflight`, `forwarded`,
//! `upstream_error`.
//!
//! Recording is a no-op until [`init_metrics`] installs the exporter.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

pub const REQUESTS_TOTAL: &str = "cors_proxy_requests_total";
pub const REQUEST_DURATION: &str = "cors_proxy_request_duration_seconds";

/// Install the Prometheus recorder and its scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;

    describe_counter!(REQUESTS_TOTAL, "Requests handled, by method, status and outcome");
    describe_histogram!(
        REQUEST_DURATION,
        "Time from request arrival to response headers, in seconds"
    );

    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Record one handled request.
pub fn record_request(method: &str, status: u16, outcome: &'static str, start: Instant) {
    counter!(
        REQUESTS_TOTAL,
        "method" => method.to_string(),
        "status" => status.to_string(),
        "outcome" => outcome,
    )
    .increment(1);
    histogram!(REQUEST_DURATION, "outcome" => outcome).record(start.elapsed().as_secs_f64());
}
