//! # taskpulse-core
//!
//! Foundation types shared by every taskpulse crate:
//!
//! - **Branded IDs**: [`ids::ParticipantId`] (`P1`, `P2`, ...), [`ids::RequestId`],
//!   [`ids::SessionToken`] as newtypes
//! - **Identity counter**: [`identity::IdentityCounter`] mints participant numbers exactly once
//! - **Timing**: [`timing::measure`] and [`timing::try_measure`] wrap an operation and report
//!   whole milliseconds
//! - **Validation**: [`errors::ValidationError`] with stable reason codes used in metric rows
//!
//! ## Crate Position
//!
//! Foundation crate. Depended on by all other taskpulse crates.

#![deny(unsafe_code)]

pub mod errors;
pub mod identity;
pub mod ids;
pub mod timing;

pub use errors::{IdParseError, ValidationError, parse_task_id, validate_title};
pub use identity::IdentityCounter;
pub use ids::{ParticipantId, RequestId, SessionToken};
pub use timing::{Timed, measure, try_measure};
