//! CSV row codec for the metrics file.
//!
//! Columns, in order: `ts_iso,session_id,request_id,task_code,step,outcome,ms,http_status,js_mode`.
//! Rows end in `\n`. A field is wrapped in double quotes only when it contains a
//! comma, a double quote, CR or LF; embedded quotes are doubled. Rows built from
//! ordinary values therefore stay plain comma-separated text.

use std::borrow::Cow;
use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::MetricsError;
use crate::event::MetricEvent;

/// Header line written once at the top of a new metrics file (without newline).
pub const HEADER: &str =
    "ts_iso,session_id,request_id,task_code,step,outcome,ms,http_status,js_mode";

const FIELD_COUNT: usize = 9;

/// Render an event as one newline-terminated row.
pub fn encode(event: &MetricEvent) -> String {
    let timestamp = event
        .timestamp
        .to_rfc3339_opts(SecondsFormat::Millis, true);
    let session = event.session_id.to_string();
    let duration = event.duration_ms.to_string();
    let status = event.http_status.to_string();

    let fields: [&str; FIELD_COUNT] = [
        &timestamp,
        &session,
        event.request_id.as_str(),
        event.task_code.as_str(),
        event.step.as_str(),
        &event.outcome,
        &duration,
        &status,
        event.js_mode.as_str(),
    ];

    let mut row = String::with_capacity(128);
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            row.push(',');
        }
        row.push_str(&quote(field));
    }
    row.push('\n');
    row
}

fn quote(field: &str) -> Cow<'_, str> {
    if field.contains([',', '"', '\r', '\n']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}

/// Parse one record's fields back into an event. `line` is used for error messages.
pub fn decode(fields: &[String], line: usize) -> Result<MetricEvent, MetricsError> {
    let [ts, session, request, task, step, outcome, ms, status, js] = fields else {
        return Err(MetricsError::malformed(
            line,
            format!("expected {FIELD_COUNT} fields, found {}", fields.len()),
        ));
    };

    let bad = |what: &str, err: &dyn std::fmt::Display| {
        MetricsError::malformed(line, format!("{what}: {err}"))
    };

    Ok(MetricEvent {
        timestamp: DateTime::parse_from_rfc3339(ts)
            .map_err(|e| bad("ts_iso", &e))?
            .with_timezone(&Utc),
        session_id: session.parse().map_err(|e| bad("session_id", &e))?,
        request_id: taskpulse_core::RequestId::from_raw(request.as_str()),
        task_code: task.parse().map_err(|e: String| bad("task_code", &e))?,
        step: step.parse().map_err(|e: String| bad("step", &e))?,
        outcome: outcome.clone(),
        duration_ms: ms.parse().map_err(|e| bad("ms", &e))?,
        http_status: status.parse().map_err(|e| bad("http_status", &e))?,
        js_mode: js.parse().map_err(|e: String| bad("js_mode", &e))?,
    })
}

/// Split file content into records, honouring quoted fields.
///
/// Each record is returned with the 1-based line number it starts on.
fn records(content: &str) -> Vec<(usize, Vec<String>)> {
    let mut out = Vec::new();
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut line = 1;
    let mut record_line = 1;
    let mut chars = content.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    field.push('"');
                    let _ = chars.next();
                } else {
                    in_quotes = false;
                }
            }
            '"' if field.is_empty() => in_quotes = true,
            ',' if !in_quotes => fields.push(std::mem::take(&mut field)),
            '\n' if !in_quotes => {
                fields.push(std::mem::take(&mut field));
                out.push((record_line, std::mem::take(&mut fields)));
                line += 1;
                record_line = line;
            }
            '\r' if !in_quotes && chars.peek() == Some(&'\n') => {}
            other => {
                if other == '\n' {
                    line += 1;
                }
                field.push(other);
            }
        }
    }

    if !field.is_empty() || !fields.is_empty() {
        fields.push(field);
        out.push((record_line, fields));
    }
    out
}

/// Read a metrics file back into events. The first record must be [`HEADER`].
pub fn read_events(path: &Path) -> Result<Vec<MetricEvent>, MetricsError> {
    let content = std::fs::read_to_string(path).map_err(|e| MetricsError::io(path, e))?;
    let mut records = records(&content).into_iter();

    match records.next() {
        Some((_, header)) if header.join(",") == HEADER => {}
        Some((line, _)) => return Err(MetricsError::malformed(line, "missing header")),
        None => return Ok(Vec::new()),
    }

    records
        .map(|(line, fields)| decode(&fields, line))
        .collect()
}
