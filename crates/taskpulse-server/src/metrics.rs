//! Prometheus metrics recorder and the counters the task routes emit.

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use taskpulse_telemetry::{MetricEvent, Step};
use tracing::info;

use crate::error::ServerError;

/// Install the Prometheus metrics recorder (global).
///
/// Returns the handle used to render `GET /metrics`. Fails if a global
/// recorder is already installed.
pub fn install_recorder() -> Result<PrometheusHandle, ServerError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    info!("prometheus metrics recorder installed");
    Ok(handle)
}

/// Render Prometheus text format from the installed recorder.
pub fn render(handle: &PrometheusHandle) -> String {
    handle.render()
}

// Metric name constants to avoid typos across crates.

/// Task events total (counter, labels: task_code, step).
pub const TASK_EVENTS_TOTAL: &str = "task_events_total";
/// Store call duration seconds for successful operations (histogram, labels: task_code).
pub const TASK_OPERATION_DURATION_SECONDS: &str = "task_operation_duration_seconds";
/// Metric rows that could not be appended to the metrics file (counter).
pub const METRICS_SINK_ERRORS_TOTAL: &str = "metrics_sink_errors_total";
/// Sessions minted total (counter).
pub const SESSIONS_CREATED_TOTAL: &str = "sessions_created_total";
/// Live sessions (gauge).
pub const SESSIONS_ACTIVE: &str = "sessions_active";

/// Count one task event, and its duration if it succeeded.
pub fn observe_event(event: &MetricEvent) {
    let task_code = event.task_code.as_str();
    counter!(TASK_EVENTS_TOTAL, "task_code" => task_code, "step" => event.step.as_str())
        .increment(1);
    if event.step == Step::Success {
        histogram!(TASK_OPERATION_DURATION_SECONDS, "task_code" => task_code)
            .record(event.duration_ms as f64 / 1000.0);
    }
}

/// Count a failed metrics-file append.
pub fn observe_sink_error() {
    counter!(METRICS_SINK_ERRORS_TOTAL).increment(1);
}

/// Count a new session and publish the live session count.
pub fn observe_session_created(active: usize) {
    counter!(SESSIONS_CREATED_TOTAL).increment(1);
    observe_sessions_active(active);
}

/// Publish the live session count.
pub fn observe_sessions_active(active: usize) {
    gauge!(SESSIONS_ACTIVE).set(active as f64);
}
