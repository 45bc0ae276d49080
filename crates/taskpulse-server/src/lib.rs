//! # taskpulse-server
//!
//! Axum HTTP layer over the task store and metrics sink.
//!
//! - Session middleware: cookie to participant identity, minted on first visit
//! - Task routes: list, add, delete and search, each search or mutation
//!   producing exactly one metric row
//! - `/health` and Prometheus `/metrics`
//! - Graceful shutdown via `CancellationToken`

#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod handlers;
pub mod health;
pub mod metrics;
pub mod server;
pub mod session;
pub mod shutdown;

pub use config::ServerConfig;
pub use error::ServerError;
pub use server::{AppState, ServerHandle, build_router, start, start_session_sweeper};
pub use shutdown::ShutdownCoordinator;
