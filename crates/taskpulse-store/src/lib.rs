//! # taskpulse-store
//!
//! Shared in-memory state behind the request layer:
//!
//! - [`TaskStore`]: ordered task list with monotonic ids that are never reused
//! - [`SessionRegistry`]: maps session tokens to participant identities, minting
//!   each identity exactly once per session

#![deny(unsafe_code)]

pub mod sessions;
pub mod tasks;

pub use sessions::{ResolvedSession, SessionRegistry};
pub use tasks::{Task, TaskStore};
