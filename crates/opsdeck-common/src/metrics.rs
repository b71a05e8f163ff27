//! Metrics and observability for Opsdeck

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

use crate::error::{Error, Result};

/// Global Prometheus recorder handle
static RECORDER: OnceCell<PrometheusHandle> = OnceCell::new();

/// Install the Prometheus recorder. Call once at startup, before any
/// metric is recorded.
pub fn init() -> Result<()> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| Error::Config(format!("failed to install metrics recorder: {e}")))?;
    RECORDER
        .set(handle)
        .map_err(|_| Error::Config("metrics recorder already installed".to_string()))?;
    Ok(())
}

/// Export metrics in Prometheus exposition format
#[must_use]
pub fn export_prometheus() -> String {
    RECORDER.get().map(PrometheusHandle::render).unwrap_or_default()
}

// ============================================================================
// Telemetry Pipeline Metrics
// ============================================================================

/// Record the outcome of one partition fetch
pub fn record_partition_fetch(container: &'static str, found: bool) {
    let outcome = if found { "hit" } else { "miss" };
    counter!("opsdeck_partition_fetches_total", "container" => container, "outcome" => outcome)
        .increment(1);
}

/// Record a fatal fetch or decode failure
pub fn record_fetch_failure(container: &'static str, kind: &'static str) {
    counter!("opsdeck_fetch_failures_total", "container" => container, "kind" => kind)
        .increment(1);
}

/// Record a completed range query
pub fn record_range_query(container: &'static str, partitions: usize, latency_ms: f64) {
    counter!("opsdeck_range_queries_total", "container" => container).increment(1);
    counter!("opsdeck_range_query_partitions_total", "container" => container)
        .increment(partitions as u64);
    histogram!("opsdeck_range_query_duration_ms", "container" => container).record(latency_ms);
}

// ============================================================================
// Cluster Metrics
// ============================================================================

/// Record a deployment image update attempt
pub fn record_image_update(success: bool) {
    let status = if success { "success" } else { "error" };
    counter!("opsdeck_image_updates_total", "status" => status).increment(1);
}
