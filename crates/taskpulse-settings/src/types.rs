//! Settings structs and their compiled defaults.
//!
//! Every struct is `#[serde(default)]`, so a settings file only needs the keys
//! it wants to change. Keys are camelCase on disk.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Root settings object.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// HTTP listener and session handling.
    pub server: ServerSettings,
    /// Metrics file.
    pub metrics: MetricsSettings,
    /// Process logging.
    pub logging: LoggingSettings,
}

impl Settings {
    /// Reject combinations that would make the server misbehave.
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(SettingsError::InvalidValue(
                "server.port must be non-zero".into(),
            ));
        }
        if self.server.host.trim().is_empty() {
            return Err(SettingsError::InvalidValue("server.host is empty".into()));
        }
        if !is_cookie_name(&self.server.session_cookie) {
            return Err(SettingsError::InvalidValue(format!(
                "server.sessionCookie is not a valid cookie name: {:?}",
                self.server.session_cookie
            )));
        }
        if self.server.session_sweep_secs == 0 {
            return Err(SettingsError::InvalidValue(
                "server.sessionSweepSecs must be non-zero".into(),
            ));
        }
        if self.metrics.path.as_os_str().is_empty() {
            return Err(SettingsError::InvalidValue("metrics.path is empty".into()));
        }
        if !LOG_LEVELS.contains(&self.logging.level.to_ascii_lowercase().as_str()) {
            return Err(SettingsError::InvalidValue(format!(
                "logging.level must be one of {LOG_LEVELS:?}, got {:?}",
                self.logging.level
            )));
        }
        Ok(())
    }
}

/// Levels accepted for `logging.level`.
pub const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

fn is_cookie_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b))
}

/// HTTP listener and session settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Bind address.
    pub host: String,
    /// Listen port.
    pub port: u16,
    /// Name of the cookie carrying the session token.
    pub session_cookie: String,
    /// Sessions idle for longer than this are forgotten.
    pub session_idle_secs: u64,
    /// How often the idle-session sweep runs.
    pub session_sweep_secs: u64,
    /// Grace period for in-flight requests on shutdown.
    pub shutdown_timeout_secs: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            session_cookie: "TASKPULSE_SESSION".to_string(),
            session_idle_secs: 86_400,
            session_sweep_secs: 300,
            shutdown_timeout_secs: 10,
        }
    }
}

impl ServerSettings {
    /// `session_idle_secs` as a [`Duration`].
    pub fn session_idle(&self) -> Duration {
        Duration::from_secs(self.session_idle_secs)
    }

    /// `session_sweep_secs` as a [`Duration`].
    pub fn session_sweep(&self) -> Duration {
        Duration::from_secs(self.session_sweep_secs)
    }

    /// `shutdown_timeout_secs` as a [`Duration`].
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

/// Metrics file settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MetricsSettings {
    /// Destination CSV file. Relative paths resolve against the working directory.
    pub path: PathBuf,
    /// `fsync` after every row.
    pub sync_writes: bool,
    /// Extra attempts after a failed append.
    pub max_retries: u32,
}

impl Default for MetricsSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/metrics.csv"),
            sync_writes: false,
            max_retries: 0,
        }
    }
}

/// Process logging settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default level; `RUST_LOG` still wins when set.
    pub level: String,
    /// Emit JSON lines.
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}
