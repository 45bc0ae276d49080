//! # taskpulse-telemetry
//!
//! Everything that leaves a trace of a request:
//!
//! - [`MetricEvent`]: one immutable row per handled task operation, with pure
//!   builders for the `success`, `validation_error` and `fail` shapes
//! - [`row`]: the CSV row codec for the fixed nine-column schema
//! - [`MetricsSink`]: serialized, append-only writer for the metrics file
//! - [`init_logging`]: `tracing` subscriber setup for the process

#![deny(unsafe_code)]

pub mod error;
pub mod event;
mod logging;
pub mod row;
pub mod sink;

pub use error::MetricsError;
pub use event::{EventContext, JsMode, MetricEvent, Step, TaskCode};
pub use logging::{LoggingConfig, init_logging};
pub use row::{HEADER, read_events};
pub use sink::{MetricsSink, SinkConfig};
