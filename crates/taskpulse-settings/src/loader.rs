//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`Settings::default()`]
//! 2. If the settings file exists, deep-merge its values over the defaults
//! 3. Apply environment variable overrides (highest priority)
//! 4. Validate the result
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::Result;
use crate::types::Settings;

/// Default settings file, relative to the working directory.
pub const DEFAULT_SETTINGS_FILE: &str = "taskpulse.json";

/// Resolve the path to the default settings file.
pub fn settings_path() -> PathBuf {
    PathBuf::from(DEFAULT_SETTINGS_FILE)
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<Settings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// A missing file yields the defaults. Invalid JSON or an invalid final value
/// is an error.
pub fn load_settings_from_path(path: &Path) -> Result<Settings> {
    let defaults = serde_json::to_value(Settings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    let mut settings: Settings = serde_json::from_value(merged)?;
    apply_env_overrides(&mut settings);
    settings.validate()?;
    Ok(settings)
}

/// Recursive deep merge of two JSON values.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply process environment overrides to loaded settings.
pub fn apply_env_overrides(settings: &mut Settings) {
    apply_overrides(settings, |name| std::env::var(name).ok());
}

/// Apply overrides from an arbitrary variable lookup.
///
/// - `PORT`, then `TASKPULSE_PORT` (1-65535; the latter wins when both are set)
/// - `TASKPULSE_HOST`, `TASKPULSE_METRICS_PATH`, `TASKPULSE_LOG_LEVEL`
/// - `TASKPULSE_LOG_JSON`: `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`
/// - `TASKPULSE_SESSION_IDLE_SECS` (60-604800)
///
/// Empty or invalid values are ignored with a warning.
pub fn apply_overrides<F>(settings: &mut Settings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    for name in ["PORT", "TASKPULSE_PORT"] {
        if let Some(v) = read_parsed(&lookup, name, |v| parse_u16_range(v, 1, u16::MAX)) {
            settings.server.port = v;
        }
    }
    if let Some(v) = read_string(&lookup, "TASKPULSE_HOST") {
        settings.server.host = v;
    }
    if let Some(v) = read_string(&lookup, "TASKPULSE_METRICS_PATH") {
        settings.metrics.path = PathBuf::from(v);
    }
    if let Some(v) = read_string(&lookup, "TASKPULSE_LOG_LEVEL") {
        settings.logging.level = v.to_ascii_lowercase();
    }
    if let Some(v) = read_parsed(&lookup, "TASKPULSE_LOG_JSON", parse_bool) {
        settings.logging.json = v;
    }
    if let Some(v) = read_parsed(&lookup, "TASKPULSE_SESSION_IDLE_SECS", |v| {
        parse_u64_range(v, 60, 604_800)
    }) {
        settings.server.session_idle_secs = v;
    }
}

// ── Env var readers (thin wrappers) ─────────────────────────────────────────

fn read_string<F>(lookup: &F, name: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name).filter(|v| !v.is_empty())
}

fn read_parsed<F, T>(lookup: &F, name: &str, parse: impl Fn(&str) -> Option<T>) -> Option<T>
where
    F: Fn(&str) -> Option<String>,
{
    let val = read_string(lookup, name)?;
    let result = parse(&val);
    if result.is_none() {
        warn!(key = name, value = %val, "invalid env var, ignoring");
    }
    result
}

// ── Pure parsing functions (testable without env vars) ──────────────────────

/// Parse a string as a boolean.
///
/// Accepts (case-insensitive): `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a string as a `u16` within a range.
pub fn parse_u16_range(val: &str, min: u16, max: u16) -> Option<u16> {
    let n: u16 = val.trim().parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `u64` within a range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.trim().parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::errors::SettingsError;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    // ── deep_merge ──────────────────────────────────────────────────

    #[test]
    fn merge_nested_override() {
        let target = serde_json::json!({"server": {"port": 8080, "host": "0.0.0.0"}});
        let source = serde_json::json!({"server": {"port": 9090}});
        let merged = deep_merge(target, source);
        assert_eq!(merged["server"]["port"], 9090);
        assert_eq!(merged["server"]["host"], "0.0.0.0");
    }

    #[test]
    fn merge_null_preserves_target() {
        let target = serde_json::json!({"a": 1, "b": 2});
        let source = serde_json::json!({"a": null});
        let merged = deep_merge(target, source);
        assert_eq!(merged["a"], 1);
        assert_eq!(merged["b"], 2);
    }

    #[test]
    fn merge_array_and_primitive_replace() {
        let target = serde_json::json!({"items": [1, 2, 3], "a": {"nested": true}});
        let source = serde_json::json!({"items": [4], "a": 42});
        let merged = deep_merge(target, source);
        assert_eq!(merged["items"], serde_json::json!([4]));
        assert_eq!(merged["a"], 42);
    }

    // ── load_settings_from_path ─────────────────────────────────────
    // Process env is not touched here; these only hold while no TASKPULSE_*
    // or PORT variable is set in the test environment.

    #[test]
    fn load_missing_file_returns_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = load_settings_from_path(&dir.path().join("absent.json")).unwrap();
        let mut expected = Settings::default();
        apply_env_overrides(&mut expected);
        assert_eq!(settings, expected);
    }

    #[test]
    fn load_partial_json_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("taskpulse.json");
        std::fs::write(
            &path,
            r#"{"server": {"sessionCookie": "COMP_SESSION"}, "metrics": {"syncWrites": true, "maxRetries": 2}}"#,
        )
        .unwrap();

        let settings = load_settings_from_path(&path).unwrap();
        assert_eq!(settings.server.session_cookie, "COMP_SESSION");
        assert!(settings.metrics.sync_writes);
        assert_eq!(settings.metrics.max_retries, 2);
        assert_eq!(settings.server.session_sweep_secs, 300);
    }

    #[test]
    fn load_invalid_json_returns_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("taskpulse.json");
        std::fs::write(&path, "not valid json").unwrap();
        assert!(matches!(
            load_settings_from_path(&path),
            Err(SettingsError::Json(_))
        ));
    }

    #[test]
    fn load_wrong_type_returns_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("taskpulse.json");
        std::fs::write(&path, r#"{"server": {"sessionIdleSecs": "forever"}}"#).unwrap();
        assert!(matches!(
            load_settings_from_path(&path),
            Err(SettingsError::Json(_))
        ));
    }

    #[test]
    fn load_rejects_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("taskpulse.json");
        std::fs::write(&path, r#"{"logging": {"level": "chatty"}}"#).unwrap();
        assert!(matches!(
            load_settings_from_path(&path),
            Err(SettingsError::InvalidValue(_))
        ));
    }

    // ── apply_overrides ─────────────────────────────────────────────

    #[test]
    fn overrides_apply_every_key() {
        let mut settings = Settings::default();
        apply_overrides(
            &mut settings,
            env(&[
                ("PORT", "3000"),
                ("TASKPULSE_HOST", "127.0.0.1"),
                ("TASKPULSE_METRICS_PATH", "/var/lib/taskpulse/metrics.csv"),
                ("TASKPULSE_LOG_LEVEL", "DEBUG"),
                ("TASKPULSE_LOG_JSON", "yes"),
                ("TASKPULSE_SESSION_IDLE_SECS", "3600"),
            ]),
        );
        assert_eq!(settings.server.port, 3000);
        assert_eq!(settings.server.host, "127.0.0.1");
        assert_eq!(
            settings.metrics.path,
            PathBuf::from("/var/lib/taskpulse/metrics.csv")
        );
        assert_eq!(settings.logging.level, "debug");
        assert!(settings.logging.json);
        assert_eq!(settings.server.session_idle_secs, 3600);
    }

    #[test]
    fn prefixed_port_wins_over_plain_port() {
        let mut settings = Settings::default();
        apply_overrides(
            &mut settings,
            env(&[("PORT", "3000"), ("TASKPULSE_PORT", "4000")]),
        );
        assert_eq!(settings.server.port, 4000);
    }

    #[test]
    fn invalid_overrides_are_ignored() {
        let mut settings = Settings::default();
        apply_overrides(
            &mut settings,
            env(&[
                ("PORT", "0"),
                ("TASKPULSE_HOST", ""),
                ("TASKPULSE_LOG_JSON", "maybe"),
                ("TASKPULSE_SESSION_IDLE_SECS", "5"),
            ]),
        );
        assert_eq!(settings, Settings::default());
    }

    // ── parse helpers ───────────────────────────────────────────────

    #[test]
    fn parse_bool_variants() {
        for val in ["true", "1", "yes", "on", "TRUE", "On"] {
            assert_eq!(parse_bool(val), Some(true), "failed for {val}");
        }
        for val in ["false", "0", "no", "off", "No"] {
            assert_eq!(parse_bool(val), Some(false), "failed for {val}");
        }
        assert_eq!(parse_bool("maybe"), None);
        assert_eq!(parse_bool(""), None);
    }

    #[test]
    fn parse_u16_bounds() {
        assert_eq!(parse_u16_range("8080", 1, 65535), Some(8080));
        assert_eq!(parse_u16_range("0", 1, 65535), None);
        assert_eq!(parse_u16_range("99999", 1, 65535), None);
        assert_eq!(parse_u16_range("http", 1, 65535), None);
    }

    #[test]
    fn parse_u64_bounds() {
        assert_eq!(parse_u64_range("60", 60, 604_800), Some(60));
        assert_eq!(parse_u64_range("604801", 60, 604_800), None);
        assert_eq!(parse_u64_range("-1", 60, 604_800), None);
    }
}
