//! Metrics collection and exposition.
//!
//! # Metrics
//! - `router_renders_total` (counter): server renders by status
//! - `router_render_duration_seconds` (histogram): render latency
//! - `router_navigations_total` (counter): client navigations by outcome
//! - `router_prefetch_total` (counter): prefetch lookups by hit/miss
//! - `router_template_reloads_total` (counter): template reloads by outcome
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op
//! - Exposition is a Prometheus scrape endpoint on its own address

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its HTTP listener.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Record one server render.
pub fn record_render(status: u16, start: Instant) {
    let status = status.to_string();
    counter!("router_renders_total", "status" => status.clone()).increment(1);
    histogram!("router_render_duration_seconds", "status" => status)
        .record(start.elapsed().as_secs_f64());
}

/// Record how a client navigation ended.
pub fn record_navigation(outcome: &'static str) {
    counter!("router_navigations_total", "outcome" => outcome).increment(1);
}

/// Record a template reload attempt.
pub fn record_template_reload(ok: bool) {
    let result = if ok { "ok" } else { "rejected" };
    counter!("router_template_reloads_total", "result" => result).increment(1);
}

/// Record whether a navigation found a usable prefetch.
pub fn record_prefetch(hit: bool) {
    let result = if hit { "hit" } else { "miss" };
    counter!("router_prefetch_total", "result" => result).increment(1);
}
