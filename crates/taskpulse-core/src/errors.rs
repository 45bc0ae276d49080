//! Error types and input classification.
//!
//! Validation happens in the request layer before the task store is touched.
//! Each [`ValidationError`] carries a stable reason code that ends up in the
//! `outcome` column of a `validation_error` metric row.

use thiserror::Error;

/// Input rejected before reaching the task store.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The title was empty after trimming.
    #[error("title must not be blank")]
    BlankTitle,
    /// The task id was not an integer.
    #[error("invalid task id: {0:?}")]
    InvalidId(String),
}

impl ValidationError {
    /// Short reason code for metric rows.
    pub fn reason_code(&self) -> &'static str {
        match self {
            Self::BlankTitle => "blank_title",
            Self::InvalidId(_) => "invalid_id",
        }
    }
}

/// A branded id could not be parsed from text.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("invalid {kind} id: {raw:?}")]
pub struct IdParseError {
    kind: &'static str,
    raw: String,
}

impl IdParseError {
    pub(crate) fn new(kind: &'static str, raw: &str) -> Self {
        Self {
            kind,
            raw: raw.to_owned(),
        }
    }
}

/// Trim a submitted title and reject it if nothing is left.
pub fn validate_title(raw: &str) -> Result<String, ValidationError> {
    let title = raw.trim();
    if title.is_empty() {
        return Err(ValidationError::BlankTitle);
    }
    Ok(title.to_owned())
}

/// Parse a task id from a path segment or form field.
///
/// Any integer that fits in an `i64` is accepted, including zero and negative
/// values; those simply match no task.
pub fn parse_task_id(raw: &str) -> Result<i64, ValidationError> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| ValidationError::InvalidId(raw.to_owned()))
}
