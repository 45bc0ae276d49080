//! # taskpulse-settings
//!
//! Configuration for the taskpulse service.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults** ([`Settings::default()`])
//! 2. **Settings file** (`./taskpulse.json` or an explicit path, deep-merged over defaults)
//! 3. **Environment variables** (`PORT` and `TASKPULSE_*` overrides, highest priority)

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{
    DEFAULT_SETTINGS_FILE, apply_env_overrides, apply_overrides, deep_merge, load_settings,
    load_settings_from_path, settings_path,
};
pub use types::{LOG_LEVELS, LoggingSettings, MetricsSettings, ServerSettings, Settings};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn re_exports_work() {
        let _settings = Settings::default();
        assert_eq!(settings_path(), std::path::PathBuf::from(DEFAULT_SETTINGS_FILE));
    }
}
