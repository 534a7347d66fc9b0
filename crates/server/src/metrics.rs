// crates/server/src/metrics.rs
//! Application metrics for Prometheus monitoring.
//!
//! This module provides:
//! - Prometheus metrics recorder initialization
//! - Metric definitions (counters, gauges)
//! - Helper functions for recording metrics
//!
//! Recording before [`init_metrics`] is harmless: the `metrics` facade
//! discards values when no recorder is installed.

use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;

use trainview_core::Severity;

use crate::hub::DeliveryError;

/// Global Prometheus handle for rendering metrics.
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize the Prometheus metrics recorder.
///
/// Returns `true` if initialization succeeded, `false` if already initialized.
pub fn init_metrics() -> bool {
    if PROMETHEUS_HANDLE.get().is_some() {
        return false;
    }

    let recorder = PrometheusBuilder::new().build_recorder();
    let handle = recorder.handle();

    if metrics::set_global_recorder(recorder).is_err() {
        tracing::warn!("Failed to set global metrics recorder (already set)");
        return false;
    }

    if PROMETHEUS_HANDLE.set(handle).is_err() {
        tracing::warn!("Failed to store Prometheus handle (already set)");
    }

    describe_metrics();

    tracing::info!("Prometheus metrics initialized");
    true
}

fn describe_metrics() {
    describe_gauge!("stream_sessions", "Observers currently attached to the training stream");
    describe_counter!(
        "stream_messages_total",
        "Stream messages broadcast, by message type"
    );
    describe_counter!(
        "stream_deliveries_total",
        "Individual session deliveries, by message type"
    );
    describe_counter!(
        "stream_delivery_failures_total",
        "Session sends that failed and caused the session to be pruned"
    );
    describe_counter!(
        "training_records_forwarded_total",
        "Measurement records forwarded from the current generation"
    );
    describe_counter!(
        "training_stale_drops_total",
        "Records discarded because their generation was superseded"
    );
    describe_counter!("advisory_notices_total", "Advisory notices produced, by severity");
    describe_counter!("training_runs_total", "Producer runs finished, by outcome");
}

/// Render current metrics in Prometheus text format.
///
/// Returns `None` if metrics are not initialized.
pub fn render_metrics() -> Option<String> {
    PROMETHEUS_HANDLE.get().map(|h| h.render())
}

pub fn record_sessions(total: usize) {
    gauge!("stream_sessions").set(total as f64);
}

pub fn record_broadcast(kind: &'static str, delivered: usize) {
    counter!("stream_messages_total", "type" => kind).increment(1);
    counter!("stream_deliveries_total", "type" => kind).increment(delivered as u64);
}

pub fn record_delivery_failure(err: &DeliveryError) {
    let reason = match err {
        DeliveryError::Closed(_) => "closed",
        DeliveryError::Backlogged(_) => "backlogged",
    };
    counter!("stream_delivery_failures_total", "reason" => reason).increment(1);
}

pub fn record_forwarded() {
    counter!("training_records_forwarded_total").increment(1);
}

/// Count a record discarded at the generation boundary.
pub fn record_stale_drop() {
    counter!("training_stale_drops_total").increment(1);
}

pub fn record_notice(severity: Severity) {
    counter!("advisory_notices_total", "severity" => severity.as_str()).increment(1);
}

/// Count a finished producer run. `outcome` is "completed", "cancelled" or "failed".
pub fn record_run(outcome: &'static str) {
    counter!("training_runs_total", "outcome" => outcome).increment(1);
}
