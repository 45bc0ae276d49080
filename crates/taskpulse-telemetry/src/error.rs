//! Metrics error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while writing or reading the metrics log.
#[derive(Debug, Error)]
pub enum MetricsError {
    /// The metrics file could not be opened, locked, or appended to.
    #[error("metrics I/O error on {}: {source}", path.display())]
    Io {
        /// File being written or read.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// A row read back from the file did not match the schema.
    #[error("malformed metrics row {line}: {reason}")]
    Malformed {
        /// 1-based line number in the file.
        line: usize,
        /// What was wrong with it.
        reason: String,
    },
}

impl MetricsError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn malformed(line: usize, reason: impl Into<String>) -> Self {
        Self::Malformed {
            line,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_display() {
        let err = MetricsError::io(
            "data/metrics.csv",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        let msg = err.to_string();
        assert!(msg.contains("data/metrics.csv"), "got: {msg}");
        assert!(msg.contains("denied"), "got: {msg}");
    }

    #[test]
    fn malformed_display() {
        let err = MetricsError::malformed(3, "expected 9 fields, found 4");
        assert_eq!(
            err.to_string(),
            "malformed metrics row 3: expected 9 fields, found 4"
        );
    }
}
