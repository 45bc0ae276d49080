//! Task route handlers.
//!
//! Each mutating or filtering route produces exactly one metric event. Input is
//! validated before the store is touched; a validation failure records a
//! `validation_error` row and never reaches the store. Store calls run on the
//! blocking pool and are timed there, so the recorded duration covers only the
//! store operation.
//!
//! Form bodies and query strings are read raw and decoded here rather than by a
//! typed extractor, so a malformed request still reaches the handler and gets
//! its row. Repeated keys resolve to the first value.

use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::{Extension, Path, RawQuery, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Redirect, Response};
use serde::Serialize;
use taskpulse_core::{Timed, ValidationError, measure, parse_task_id, validate_title};
use taskpulse_store::{ResolvedSession, Task};
use taskpulse_telemetry::{EventContext, MetricEvent, TaskCode};
use tokio::task::JoinError;
use tracing::{error, info};

use crate::health::{self, HealthResponse};
use crate::metrics;
use crate::server::AppState;
use crate::session::js_mode;

/// Outcome recorded when a store call could not complete.
pub const INTERNAL_ERROR: &str = "internal_error";

/// First value for `key` in a urlencoded string. Absent keys yield `""`.
pub fn first_value(encoded: &[u8], key: &str) -> String {
    url::form_urlencoded::parse(encoded)
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
        .unwrap_or_default()
}

/// JSON error body for 4xx/5xx answers.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Reason code, same as the metric row's `outcome`.
    pub error: String,
    /// Human-readable message.
    pub message: String,
}

fn error_response(status: StatusCode, code: &str, message: impl Into<String>) -> Response {
    let body = ErrorBody {
        error: code.to_owned(),
        message: message.into(),
    };
    (status, Json(body)).into_response()
}

/// GET /tasks
pub async fn list_tasks(State(state): State<AppState>) -> Json<Vec<Task>> {
    Json(state.tasks.all())
}

/// POST /tasks
pub async fn add_task(
    State(state): State<AppState>,
    Extension(session): Extension<ResolvedSession>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let ctx = EventContext::new(session.participant, js_mode(&headers));

    // an unreadable body has no title
    let raw_title = body.map(|b| first_value(&b, "title")).unwrap_or_default();
    let title = match validate_title(&raw_title) {
        Ok(title) => title,
        Err(e) => return reject(&state, &ctx, TaskCode::Add, &e).await,
    };

    let tasks = state.tasks.clone();
    match run_timed(move || tasks.add(title)).await {
        Ok(timed) => {
            let (task, duration_ms) = timed.into_parts();
            info!(participant = %ctx.session_id, task_id = task.id, "task added");
            record(&state, MetricEvent::success(&ctx, TaskCode::Add, duration_ms)).await;
            Redirect::to("/tasks").into_response()
        }
        Err(e) => fail(&state, &ctx, TaskCode::Add, &e).await,
    }
}

/// POST /tasks/{id}/delete
pub async fn delete_task(
    State(state): State<AppState>,
    Extension(session): Extension<ResolvedSession>,
    headers: HeaderMap,
    Path(raw_id): Path<String>,
) -> Response {
    let ctx = EventContext::new(session.participant, js_mode(&headers));

    let id = match parse_task_id(&raw_id) {
        Ok(id) => id,
        Err(e) => return reject(&state, &ctx, TaskCode::Delete, &e).await,
    };

    let tasks = state.tasks.clone();
    // ids below 1 are never issued, so they remove nothing
    match run_timed(move || u64::try_from(id).is_ok_and(|id| tasks.delete(id))).await {
        Ok(timed) => {
            let (removed, duration_ms) = timed.into_parts();
            info!(participant = %ctx.session_id, task_id = id, removed, "task delete");
            record(&state, MetricEvent::success(&ctx, TaskCode::Delete, duration_ms)).await;
            Redirect::to("/tasks").into_response()
        }
        Err(e) => fail(&state, &ctx, TaskCode::Delete, &e).await,
    }
}

/// GET /tasks/search?q=
pub async fn search_tasks(
    State(state): State<AppState>,
    Extension(session): Extension<ResolvedSession>,
    headers: HeaderMap,
    RawQuery(raw): RawQuery,
) -> Response {
    let ctx = EventContext::new(session.participant, js_mode(&headers));
    let q = first_value(raw.unwrap_or_default().as_bytes(), "q");
    let query = q.trim().to_owned();

    let tasks = state.tasks.clone();
    match run_timed(move || tasks.filter(&query)).await {
        Ok(timed) => {
            let (matches, duration_ms) = timed.into_parts();
            record(&state, MetricEvent::success(&ctx, TaskCode::Filter, duration_ms)).await;
            Json(matches).into_response()
        }
        Err(e) => fail(&state, &ctx, TaskCode::Filter, &e).await,
    }
}

/// GET /health
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(health::health_check(
        state.start_time,
        state.tasks.len(),
        state.sessions.len(),
    ))
}

/// GET /metrics
pub async fn metrics_handler(State(state): State<AppState>) -> Response {
    match &state.prometheus {
        Some(handle) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            metrics::render(handle),
        )
            .into_response(),
        None => error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            "metrics_disabled",
            "metrics recorder is not installed",
        ),
    }
}

/// Run a store call on the blocking pool and time it there.
pub async fn run_timed<T, F>(op: F) -> Result<Timed<T>, JoinError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(move || measure(op)).await
}

async fn reject(
    state: &AppState,
    ctx: &EventContext,
    task_code: TaskCode,
    err: &ValidationError,
) -> Response {
    let code = err.reason_code();
    record(state, MetricEvent::validation_error(ctx, task_code, code)).await;
    error_response(StatusCode::BAD_REQUEST, code, err.to_string())
}

/// Record a `fail` event for a store call that did not complete and answer 500.
pub async fn fail(
    state: &AppState,
    ctx: &EventContext,
    task_code: TaskCode,
    err: &JoinError,
) -> Response {
    error!(
        request_id = %ctx.request_id,
        task_code = %task_code,
        error = %err,
        "store operation failed"
    );
    record(state, MetricEvent::fail(ctx, task_code, INTERNAL_ERROR)).await;
    error_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        INTERNAL_ERROR,
        "the operation could not be completed",
    )
}

/// Append an event to the metrics file off the async workers.
///
/// A write failure is logged and counted; the caller's response is unaffected.
pub async fn record(state: &AppState, event: MetricEvent) {
    metrics::observe_event(&event);

    let sink = Arc::clone(&state.sink);
    let request_id = event.request_id.clone();
    let result = tokio::task::spawn_blocking(move || sink.record(&event)).await;

    let err = match result {
        Ok(Ok(())) => return,
        Ok(Err(e)) => e.to_string(),
        Err(e) => e.to_string(),
    };
    metrics::observe_sink_error();
    error!(request_id = %request_id, error = %err, "failed to record metric event");
}

#[cfg(test)]
mod tests {
    use taskpulse_core::ParticipantId;
    use taskpulse_telemetry::{JsMode, MetricsSink, SinkConfig, Step, read_events};

    use super::*;
    use crate::config::ServerConfig;

    fn state_in(dir: &tempfile::TempDir) -> AppState {
        let sink = MetricsSink::new(SinkConfig::new(dir.path().join("metrics.csv")));
        AppState::new(ServerConfig::default(), sink)
    }

    fn ctx() -> EventContext {
        EventContext::new(ParticipantId::from_sequence(1).unwrap(), JsMode::On)
    }

    #[test]
    fn first_value_takes_the_first_occurrence() {
        assert_eq!(first_value(b"title=a&title=b", "title"), "a");
        assert_eq!(first_value(b"x=1&q=%20Buy+milk", "q"), " Buy milk");
        assert_eq!(first_value(b"other=1", "title"), "");
        assert_eq!(first_value(b"", "q"), "");
        assert_eq!(first_value(b"title=%ZZ", "title"), "%ZZ");
    }

    #[tokio::test]
    async fn run_timed_returns_value() {
        let timed = run_timed(|| 6 * 7).await.unwrap();
        assert_eq!(timed.value, 42);
    }

    #[tokio::test]
    async fn run_timed_surfaces_panics() {
        let result = run_timed(|| -> u64 { panic!("store poisoned") }).await;
        assert!(result.unwrap_err().is_panic());
    }

    #[tokio::test]
    async fn fail_records_internal_error_row() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_in(&dir);
        let err = run_timed(|| -> u64 { panic!("boom") }).await.unwrap_err();

        let resp = fail(&state, &ctx(), TaskCode::Delete, &err).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let events = read_events(state.sink.path()).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].step, Step::Fail);
        assert_eq!(events[0].outcome, INTERNAL_ERROR);
        assert_eq!(events[0].http_status, 500);
        assert_eq!(events[0].duration_ms, 0);
        assert_eq!(events[0].task_code, TaskCode::Delete);
        assert_eq!(events[0].js_mode, JsMode::On);
    }

    #[tokio::test]
    async fn sink_failure_does_not_panic() {
        let dir = tempfile::tempdir().unwrap();
        // a directory is not appendable
        let sink = MetricsSink::new(SinkConfig::new(dir.path()));
        let state = AppState::new(ServerConfig::default(), sink);
        record(&state, MetricEvent::success(&ctx(), TaskCode::Add, 1)).await;
    }
}
