//! Wall-clock timing of a single operation.

use std::time::Instant;

/// An operation's result paired with how long it took.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Timed<T> {
    /// What the operation returned.
    pub value: T,
    /// Elapsed wall-clock time in whole milliseconds.
    pub duration_ms: u64,
}

impl<T> Timed<T> {
    /// Split into `(value, duration_ms)`.
    pub fn into_parts(self) -> (T, u64) {
        (self.value, self.duration_ms)
    }
}

/// Run `op` and measure it.
pub fn measure<T>(op: impl FnOnce() -> T) -> Timed<T> {
    let start = Instant::now();
    let value = op();
    Timed {
        value,
        duration_ms: elapsed_ms(start),
    }
}

/// Run a fallible `op` and measure it.
///
/// An error is returned unchanged and its duration is dropped.
pub fn try_measure<T, E>(op: impl FnOnce() -> Result<T, E>) -> Result<Timed<T>, E> {
    let start = Instant::now();
    let value = op()?;
    Ok(Timed {
        value,
        duration_ms: elapsed_ms(start),
    })
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}
