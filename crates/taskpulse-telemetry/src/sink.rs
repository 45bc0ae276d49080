//! Append-only metrics file writer.
//!
//! The file handle is opened lazily on first use and owned by the sink. Every
//! append runs under the sink's mutex and an exclusive advisory lock on the
//! file, so the "write the header if the file is empty" check and the row write
//! happen as one step. Separate sinks (or processes) pointed at the same path
//! therefore still produce a single header and whole rows.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::error::MetricsError;
use crate::event::MetricEvent;
use crate::row::{self, HEADER};

/// Configuration for [`MetricsSink`].
#[derive(Clone, Debug)]
pub struct SinkConfig {
    /// Destination file. Parent directories are created on open.
    pub path: PathBuf,
    /// `fsync` file data after every row.
    pub sync_writes: bool,
    /// Extra attempts after a failed append. `0` fails on the first error.
    pub max_retries: u32,
}

impl SinkConfig {
    /// Defaults for a given destination: no fsync, no retries.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            sync_writes: false,
            max_retries: 0,
        }
    }
}

/// Serialized writer for the metrics CSV file.
pub struct MetricsSink {
    config: SinkConfig,
    file: Mutex<Option<File>>,
}

impl MetricsSink {
    /// Create a sink. Nothing touches the filesystem until the first write.
    pub fn new(config: SinkConfig) -> Self {
        Self {
            config,
            file: Mutex::new(None),
        }
    }

    /// Destination path.
    pub fn path(&self) -> &Path {
        &self.config.path
    }

    /// Open the file and write the header now if it is new. Optional; `record`
    /// does the same on first use.
    pub fn init(&self) -> Result<(), MetricsError> {
        self.with_locked_file(|file| {
            if file.metadata()?.len() == 0 {
                file.write_all(format!("{HEADER}\n").as_bytes())?;
            }
            Ok(())
        })
    }

    /// Append one event as a single row.
    pub fn record(&self, event: &MetricEvent) -> Result<(), MetricsError> {
        let row = row::encode(event);
        let mut attempt = 0;
        loop {
            match self.append(&row) {
                Ok(()) => {
                    debug!(
                        request_id = %event.request_id,
                        task_code = %event.task_code,
                        step = %event.step,
                        "metric recorded"
                    );
                    return Ok(());
                }
                Err(e) if attempt < self.config.max_retries => {
                    attempt += 1;
                    warn!(attempt, error = %e, "metrics append failed, retrying");
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn append(&self, row: &str) -> Result<(), MetricsError> {
        let sync = self.config.sync_writes;
        self.with_locked_file(|file| {
            write_or_truncate(file, |file, start| {
                let mut buf = String::with_capacity(HEADER.len() + row.len() + 1);
                if start == 0 {
                    buf.push_str(HEADER);
                    buf.push('\n');
                }
                buf.push_str(row);
                file.write_all(buf.as_bytes())?;
                if sync {
                    file.sync_data()?;
                }
                Ok(())
            })
        })
    }

    /// Run `f` with the open file while holding both the mutex and the file lock.
    /// A failed call drops the handle so the next call reopens the file.
    fn with_locked_file<F>(&self, f: F) -> Result<(), MetricsError>
    where
        F: FnOnce(&mut File) -> std::io::Result<()>,
    {
        let path = &self.config.path;
        let mut guard = self.file.lock();

        let file = match &mut *guard {
            Some(file) => file,
            slot @ None => slot.insert(open_append(path).map_err(|e| MetricsError::io(path, e))?),
        };

        let result = FileExt::lock_exclusive(&*file).and_then(|()| {
            let written = f(file);
            let unlocked = FileExt::unlock(&*file);
            written.and(unlocked)
        });

        if let Err(e) = result {
            *guard = None;
            return Err(MetricsError::io(path, e));
        }
        Ok(())
    }
}

impl std::fmt::Debug for MetricsSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsSink")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Run `write` against `file`, cutting the file back to its starting length if
/// it fails. Must be called with the file lock held.
fn write_or_truncate<F>(file: &mut File, write: F) -> std::io::Result<()>
where
    F: FnOnce(&mut File, u64) -> std::io::Result<()>,
{
    let start = file.metadata()?.len();
    let result = write(file, start);
    if result.is_err()
        && let Err(e) = file.set_len(start)
    {
        warn!(error = %e, len = start, "failed to discard partial metrics row");
    }
    result
}

fn open_append(path: &Path) -> std::io::Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}
