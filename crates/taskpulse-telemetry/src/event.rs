//! Metric event model.
//!
//! A [`MetricEvent`] describes the terminal outcome of one handled task
//! operation. The three builders fill in the fixed parts of each shape:
//!
//! | shape | step | outcome | duration | http status |
//! |---|---|---|---|---|
//! | [`MetricEvent::success`] | `success` | empty | measured | 200 |
//! | [`MetricEvent::validation_error`] | `validation_error` | reason code | 0 | 400 |
//! | [`MetricEvent::fail`] | `fail` | reason code | 0 | 500 |
//!
//! Builders only construct values; writing happens in [`crate::MetricsSink::record`].

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use taskpulse_core::{ParticipantId, RequestId};

/// Which user-facing operation an event describes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskCode {
    /// Add a task.
    #[serde(rename = "T1_add")]
    Add,
    /// Delete a task.
    #[serde(rename = "T2_delete")]
    Delete,
    /// Filter the task list.
    #[serde(rename = "T3_filter")]
    Filter,
}

impl TaskCode {
    /// Wire form used in the metrics file.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Add => "T1_add",
            Self::Delete => "T2_delete",
            Self::Filter => "T3_filter",
        }
    }
}

/// How the operation ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    /// The store call completed.
    Success,
    /// Input was rejected before the store was called.
    ValidationError,
    /// The operation failed internally.
    Fail,
}

impl Step {
    /// Wire form used in the metrics file.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::ValidationError => "validation_error",
            Self::Fail => "fail",
        }
    }
}

/// Whether the request came from the partial-update transport (`on`) or a
/// full page navigation (`off`).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JsMode {
    /// Progressive-enhancement request.
    On,
    /// Plain navigation.
    #[default]
    Off,
}

impl JsMode {
    /// Wire form used in the metrics file.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::On => "on",
            Self::Off => "off",
        }
    }
}

impl From<bool> for JsMode {
    fn from(enhanced: bool) -> Self {
        if enhanced { Self::On } else { Self::Off }
    }
}

macro_rules! wire_enum {
    ($name:ident, $label:literal, [$($variant:ident),+]) => {
        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = String;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                $(
                    if s == Self::$variant.as_str() {
                        return Ok(Self::$variant);
                    }
                )+
                Err(format!("unknown {}: {s}", $label))
            }
        }
    };
}

wire_enum!(TaskCode, "task code", [Add, Delete, Filter]);
wire_enum!(Step, "step", [Success, ValidationError, Fail]);
wire_enum!(JsMode, "js mode", [On, Off]);

/// Per-request fields shared by every event the request emits.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventContext {
    /// Participant the request belongs to.
    pub session_id: ParticipantId,
    /// Token for this request.
    pub request_id: RequestId,
    /// Transport flavour of the request.
    pub js_mode: JsMode,
}

impl EventContext {
    /// Context for a new request, minting its request id.
    pub fn new(session_id: ParticipantId, js_mode: JsMode) -> Self {
        Self {
            session_id,
            request_id: RequestId::new(),
            js_mode,
        }
    }
}

/// One row of the metrics log. Never modified once written.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricEvent {
    /// When the event was created.
    pub timestamp: DateTime<Utc>,
    /// Participant label (`P<n>`).
    pub session_id: ParticipantId,
    /// Request token.
    pub request_id: RequestId,
    /// Operation.
    pub task_code: TaskCode,
    /// Outcome class.
    pub step: Step,
    /// Reason code; empty for successes.
    pub outcome: String,
    /// Duration of the store call in milliseconds; 0 unless successful.
    pub duration_ms: u64,
    /// Status code reported for the request.
    pub http_status: u16,
    /// Transport flavour.
    pub js_mode: JsMode,
}

impl MetricEvent {
    /// Successful store call that took `duration_ms`.
    pub fn success(ctx: &EventContext, task_code: TaskCode, duration_ms: u64) -> Self {
        Self::shaped(ctx, task_code, Step::Success, String::new(), duration_ms, 200)
    }

    /// Input rejected with `reason` before the store was called.
    pub fn validation_error(
        ctx: &EventContext,
        task_code: TaskCode,
        reason: impl Into<String>,
    ) -> Self {
        Self::shaped(ctx, task_code, Step::ValidationError, reason.into(), 0, 400)
    }

    /// Internal failure described by `reason`.
    pub fn fail(ctx: &EventContext, task_code: TaskCode, reason: impl Into<String>) -> Self {
        Self::shaped(ctx, task_code, Step::Fail, reason.into(), 0, 500)
    }

    /// Replace the creation timestamp.
    #[must_use]
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    fn shaped(
        ctx: &EventContext,
        task_code: TaskCode,
        step: Step,
        outcome: String,
        duration_ms: u64,
        http_status: u16,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            session_id: ctx.session_id,
            request_id: ctx.request_id.clone(),
            task_code,
            step,
            outcome,
            duration_ms,
            http_status,
            js_mode: ctx.js_mode,
        }
    }
}
