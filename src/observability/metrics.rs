//! Metrics collection and exposition.
//!
//! # Metrics
//! - `control_registrations_total` (counter): RegisterProxy calls
//! - `control_subscriptions_total` (counter): subscribe streams opened
//! - `control_active_subscriptions` (gauge): subscribe streams currently open
//! - `control_registry_size` (gauge): entries in the proxy registry
//! - `control_config_version` (gauge): current config version
//! - `control_config_mutations_total` (counter): by `kind` (replace, append)
//! - `control_broadcasts_total` (counter): broadcast calls
//! - `control_pushes_total` (counter): per-target outcome (delivered, full, closed)

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_registration() {
    metrics::counter!("control_registrations_total").increment(1);
}

pub fn record_subscription_opened() {
    metrics::counter!("control_subscriptions_total").increment(1);
    metrics::gauge!("control_active_subscriptions").increment(1.0);
}

pub fn record_subscription_closed() {
    metrics::gauge!("control_active_subscriptions").decrement(1.0);
}

pub fn record_registry_size(size: usize) {
    metrics::gauge!("control_registry_size").set(size as f64);
}

pub fn record_config_version(version: i64) {
    metrics::gauge!("control_config_version").set(version as f64);
}

pub fn record_config_mutation(kind: &'static str) {
    metrics::counter!("control_config_mutations_total", "kind" => kind).increment(1);
}

pub fn record_broadcast() {
    metrics::counter!("control_broadcasts_total").increment(1);
}

pub fn record_push(outcome: &'static str) {
    metrics::counter!("control_pushes_total", "outcome" => outcome).increment(1);
}
