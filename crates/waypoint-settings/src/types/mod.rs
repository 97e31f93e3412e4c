//! Settings types.
//!
//! All structs use `#[serde(rename_all = "camelCase", default)]` so a partial
//! settings file fills the gaps from compiled defaults.

mod database;
mod server;

pub use database::DatabaseSettings;
pub use server::{LoggingSettings, ServerSettings};

use serde::{Deserialize, Serialize};

/// Root settings object.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WaypointSettings {
    /// HTTP server settings.
    pub server: ServerSettings,
    /// Database settings.
    pub database: DatabaseSettings,
    /// Logging settings.
    pub logging: LoggingSettings,
}
