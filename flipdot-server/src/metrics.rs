//! Prometheus metrics for flipdot-server.
//!
//! Provides metrics collection and a Prometheus-compatible `/metrics` endpoint.

use metrics::{counter, gauge};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

// Metric names as constants for consistency
const STORE_OPERATIONS_TOTAL: &str = "flipdot_store_operations_total";
const VALIDATION_FAILURES_TOTAL: &str = "flipdot_validation_failures_total";
const FRAMES_DISPLAYED_TOTAL: &str = "flipdot_frames_displayed_total";
const ANIMATIONS_STORED: &str = "flipdot_animations_stored";
const LIBRARY_FLUSHES_TOTAL: &str = "flipdot_library_flushes_total";

/// Initialize metrics and return the Prometheus handle.
///
/// # Errors
///
/// Returns an error if the Prometheus recorder cannot be installed
/// (e.g., if another recorder is already installed).
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Record a store operation.
///
/// # Arguments
///
/// * `op` - "get", "save", "list", "select" or "delete"
/// * `success` - Whether the operation succeeded
pub fn record_store_operation(op: &str, success: bool) {
    counter!(
        STORE_OPERATIONS_TOTAL,
        "op" => op.to_string(),
        "success" => success.to_string()
    )
    .increment(1);
}

/// Record an input validation failure.
///
/// # Arguments
///
/// * `validation_type` - What failed (name, text, document, body, scene)
pub fn record_validation_failure(validation_type: &str) {
    counter!(
        VALIDATION_FAILURES_TOTAL,
        "type" => validation_type.to_string()
    )
    .increment(1);
}

/// Record a frame pushed to the display.
pub fn record_frame_displayed() {
    counter!(FRAMES_DISPLAYED_TOTAL).increment(1);
}

/// Update the stored animation count.
#[allow(clippy::cast_precision_loss)]
pub fn set_animations_stored(count: usize) {
    gauge!(ANIMATIONS_STORED).set(count as f64);
}

/// Record a library flush attempt.
///
/// # Arguments
///
/// * `outcome` - "written", "clean" or "failed"
pub fn record_flush(outcome: &str) {
    counter!(
        LIBRARY_FLUSHES_TOTAL,
        "outcome" => outcome.to_string()
    )
    .increment(1);
}
