//! Server configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use taskpulse_settings::ServerSettings;

/// Configuration for the HTTP server.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind (default `"0.0.0.0"`).
    pub host: String,
    /// Port to bind (default `8080`, `0` picks a free port).
    pub port: u16,
    /// Name of the cookie carrying the session token.
    pub session_cookie: String,
    /// Sessions idle for longer than this are forgotten.
    pub session_idle: Duration,
    /// Interval between idle-session sweeps.
    pub session_sweep: Duration,
    /// Grace period for in-flight requests on shutdown.
    pub shutdown_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::from(&ServerSettings::default())
    }
}

impl From<&ServerSettings> for ServerConfig {
    fn from(settings: &ServerSettings) -> Self {
        Self {
            host: settings.host.clone(),
            port: settings.port,
            session_cookie: settings.session_cookie.clone(),
            session_idle: settings.session_idle(),
            session_sweep: settings.session_sweep(),
            shutdown_timeout: settings.shutdown_timeout(),
        }
    }
}

impl ServerConfig {
    /// `host:port` string passed to the listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
