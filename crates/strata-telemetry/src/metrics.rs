//! Prometheus metrics for the filter pipeline.
//!
//! Recording goes through the `metrics` facade, so the functions here are
//! no-ops until [`init_metrics`] installs a recorder.
//!
//! # Standard Metrics
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `strata_invocations_total` | Counter | `action`, `outcome` | Completed invocations |
//! | `strata_invocation_duration_seconds` | Histogram | `action` | Invocation latency |
//! | `strata_short_circuits_total` | Counter | `stage` | Filter short-circuits |
//! | `strata_stage_duration_seconds` | Histogram | `stage`, `action` | Time spent inside a stage |
//!
//! `outcome` is one of `success`, `unhandled` or `misuse`.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use strata_telemetry::metrics::record_invocation;
//!
//! record_invocation("Orders.list", "success", Duration::from_millis(45));
//! ```

use crate::error::TelemetryError;
use crate::TelemetryResult;
use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::Duration;

/// Global metrics handle for rendering.
static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Metrics configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsConfig {
    /// Whether metrics are enabled.
    pub enabled: bool,

    /// Histogram buckets for durations, in seconds.
    pub duration_buckets: Vec<f64>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            // 1ms, 5ms, 10ms, 25ms, 50ms, 100ms, 250ms, 500ms, 1s, 2.5s, 5s, 10s
            duration_buckets: vec![
                0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
            ],
        }
    }
}

/// Installs the Prometheus recorder.
///
/// Calling this again after a successful install is a no-op.
///
/// # Errors
///
/// Returns `TelemetryError::InvalidConfig` for empty buckets, or
/// `TelemetryError::MetricsInit` if another recorder is installed.
pub fn init_metrics(config: &MetricsConfig) -> TelemetryResult<()> {
    if !config.enabled || METRICS_HANDLE.get().is_some() {
        return Ok(());
    }

    let handle = PrometheusBuilder::new()
        .set_buckets(&config.duration_buckets)
        .map_err(|e| TelemetryError::InvalidConfig(e.to_string()))?
        .install_recorder()
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;

    let _ = METRICS_HANDLE.set(handle);
    register_metric_descriptions();
    Ok(())
}

/// Renders metrics in Prometheus text format.
///
/// Returns `None` if metrics are not initialized.
#[must_use]
pub fn render_metrics() -> Option<String> {
    METRICS_HANDLE.get().map(PrometheusHandle::render)
}

fn register_metric_descriptions() {
    describe_counter!("strata_invocations_total", "Completed action invocations");
    describe_histogram!(
        "strata_invocation_duration_seconds",
        "Action invocation duration in seconds"
    );
    describe_counter!(
        "strata_short_circuits_total",
        "Filter short-circuits by stage"
    );
    describe_histogram!(
        "strata_stage_duration_seconds",
        "Time spent inside a pipeline stage in seconds"
    );
}

/// Records a finished invocation.
pub fn record_invocation(action: &str, outcome: &'static str, duration: Duration) {
    counter!(
        "strata_invocations_total",
        "action" => action.to_string(),
        "outcome" => outcome
    )
    .increment(1);

    histogram!(
        "strata_invocation_duration_seconds",
        "action" => action.to_string()
    )
    .record(duration.as_secs_f64());
}

/// Records a short-circuit in `stage`.
pub fn record_short_circuit(stage: &'static str) {
    counter!("strata_short_circuits_total", "stage" => stage).increment(1);
}

/// Records time spent inside `stage` for `action`.
pub fn record_stage_duration(stage: &'static str, action: &str, duration: Duration) {
    histogram!(
        "strata_stage_duration_seconds",
        "stage" => stage,
        "action" => action.to_string()
    )
    .record(duration.as_secs_f64());
}
