//! Layered settings: compiled defaults, then `~/.waypoint/settings.json`,
//! then `WAYPOINT_*` variables.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::{Result, SettingsError};
use crate::types::WaypointSettings;

/// `~/.waypoint`, or `/tmp/.waypoint` when `HOME` is unset.
pub fn data_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map_or_else(|| PathBuf::from("/tmp"), PathBuf::from)
        .join(".waypoint")
}

/// `~/.waypoint/settings.json`.
pub fn settings_path() -> PathBuf {
    data_dir().join("settings.json")
}

/// [`load_settings_from_path`] on [`settings_path`].
pub fn load_settings() -> Result<WaypointSettings> {
    load_settings_from_path(&settings_path())
}

/// Defaults, merged with the file at `path` when it exists, then the
/// process environment on top.
pub fn load_settings_from_path(path: &Path) -> Result<WaypointSettings> {
    let mut settings = load_file_layer(path)?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

/// Defaults merged with the file at `path`. No environment.
///
/// A missing file is not an error; an unreadable or malformed one is.
pub fn load_file_layer(path: &Path) -> Result<WaypointSettings> {
    let mut layered = serde_json::to_value(WaypointSettings::default())?;
    if path.is_file() {
        let text = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_owned(),
            source,
        })?;
        let file: Value = serde_json::from_str(&text).map_err(|source| SettingsError::Parse {
            path: path.to_owned(),
            source,
        })?;
        debug!(path = %path.display(), "merging settings file");
        merge_into(&mut layered, file);
    } else {
        debug!(path = %path.display(), "no settings file");
    }
    Ok(serde_json::from_value(layered)?)
}

/// `overlay` laid over `base`: objects merge key by key, `null` leaves the
/// base value alone, anything else replaces it.
pub fn deep_merge(mut base: Value, overlay: Value) -> Value {
    merge_into(&mut base, overlay);
    base
}

fn merge_into(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (_, Value::Null) => {}
        (Value::Object(into), Value::Object(from)) => {
            for (key, value) in from {
                match into.get_mut(&key) {
                    Some(slot) => merge_into(slot, value),
                    None if value.is_null() => {}
                    None => {
                        let _ = into.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

/// Overlay the process environment.
pub fn apply_env_overrides(settings: &mut WaypointSettings) {
    apply_overrides_from(settings, |name| std::env::var(name).ok());
}

/// Overlay variables read through `lookup`. A value that does not parse is
/// logged and skipped.
pub fn apply_overrides_from(settings: &mut WaypointSettings, lookup: impl Fn(&str) -> Option<String>) {
    let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    if let Some(host) = var("WAYPOINT_HOST") {
        settings.server.host = host;
    }
    if let Some(port) = var("WAYPOINT_PORT").and_then(|v| checked("WAYPOINT_PORT", &v, parse_in_range(&v, 1_u16, u16::MAX))) {
        settings.server.port = port;
    }
    if let Some(debug) = var("WAYPOINT_DEBUG").and_then(|v| checked("WAYPOINT_DEBUG", &v, parse_bool(&v))) {
        settings.server.debug = debug;
    }
    if let Some(path) = var("WAYPOINT_DB_PATH") {
        settings.database.path = path;
    }
    if let Some(size) = var("WAYPOINT_POOL_SIZE").and_then(|v| checked("WAYPOINT_POOL_SIZE", &v, parse_in_range(&v, 1_u32, 256))) {
        settings.database.pool_size = size;
    }
    if let Some(level) = var("WAYPOINT_LOG_LEVEL") {
        settings.logging.level = level;
    }
    if let Some(json) = var("WAYPOINT_LOG_JSON").and_then(|v| checked("WAYPOINT_LOG_JSON", &v, parse_bool(&v))) {
        settings.logging.json = json;
    }
}

fn checked<T>(name: &str, raw: &str, parsed: Option<T>) -> Option<T> {
    if parsed.is_none() {
        warn!(var = name, value = raw, "ignoring unusable environment override");
    }
    parsed
}

/// `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`, any case.
pub fn parse_bool(raw: &str) -> Option<bool> {
    const YES: [&str; 4] = ["true", "1", "yes", "on"];
    const NO: [&str; 4] = ["false", "0", "no", "off"];
    let raw = raw.trim();
    if YES.iter().any(|y| raw.eq_ignore_ascii_case(y)) {
        Some(true)
    } else if NO.iter().any(|n| raw.eq_ignore_ascii_case(n)) {
        Some(false)
    } else {
        None
    }
}

/// `raw` as a number in `min..=max`.
pub fn parse_in_range<T: FromStr + PartialOrd>(raw: &str, min: T, max: T) -> Option<T> {
    raw.trim().parse().ok().filter(|n| (min..=max).contains(n))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
