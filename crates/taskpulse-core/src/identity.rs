//! Process-wide participant identity counter.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::ids::ParticipantId;

/// Mints participant numbers 1, 2, 3, ... for the lifetime of the value.
///
/// Every call to [`next`](Self::next) returns a distinct value, including under
/// concurrent use. State lives in memory only and restarts at 1 with the process.
#[derive(Debug, Default)]
pub struct IdentityCounter {
    issued: AtomicU64,
}

impl IdentityCounter {
    /// Create a counter whose first value will be `1`.
    pub const fn new() -> Self {
        Self {
            issued: AtomicU64::new(0),
        }
    }

    /// Advance the counter and return the new value.
    pub fn next(&self) -> u64 {
        self.issued.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Advance the counter and wrap the value as a participant label.
    pub fn next_participant(&self) -> ParticipantId {
        ParticipantId::minted(self.next())
    }

    /// How many values have been handed out so far.
    pub fn issued(&self) -> u64 {
        self.issued.load(Ordering::Acquire)
    }
}
