//! # waypoint-settings
//!
//! Configuration management with layered sources.
//!
//! Three layers, later ones winning: compiled [`WaypointSettings::default()`],
//! then `~/.waypoint/settings.json` deep-merged over them, then `WAYPOINT_*`
//! environment variables. The binary loads settings once at startup and
//! hands each part to the component that needs it.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings, load_settings_from_path, settings_path};
pub use types::*;
