//! `GET /v1/health`: liveness plus the schema the database is on.

use std::time::Instant;

use axum::extract::State;
use axum::response::Json;
use serde::Serialize;

use crate::envelope::ApiError;
use crate::server::AppState;

/// Liveness report.
#[derive(Debug, Clone, Serialize)]
pub struct Health {
    /// `"ok"` while serving.
    pub status: &'static str,
    /// Whole seconds since the server was built.
    pub uptime_secs: u64,
    /// Newest migration recorded in the database.
    pub schema_version: u32,
    /// False when the binary knows steps the database has not run.
    pub schema_current: bool,
}

impl Health {
    /// Report for a server built at `started` over a database at `schema_version`.
    pub fn at(started: Instant, schema_version: u32) -> Self {
        Self {
            status: "ok",
            uptime_secs: started.elapsed().as_secs(),
            schema_version,
            schema_current: schema_version >= waypoint_store::migrations::latest_version(),
        }
    }
}

pub(crate) async fn handler(State(state): State<AppState>) -> Result<Json<Health>, ApiError> {
    let version = state
        .run(|conn| Ok(waypoint_store::migrations::current_version(conn)?))
        .await?;
    Ok(Json(Health::at(state.start_time, version)))
}
