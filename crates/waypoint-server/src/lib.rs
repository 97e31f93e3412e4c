//! # waypoint-server
//!
//! Axum JSON-over-HTTP surface for the planner and community services.
//!
//! - Every route lives under `/v1` and answers with the
//!   `{status, message?, data?, error?}` [`envelope`]
//! - The acting user comes from the [`identity`] extractors
//! - Service calls run on the blocking pool through [`server::AppState::run`]
//! - Graceful shutdown via `tokio::signal` + `CancellationToken`

#![deny(unsafe_code)]

pub mod envelope;
pub mod health;
pub mod identity;
pub mod routes;
pub mod server;
pub mod shutdown;

pub use server::{AppState, WaypointServer};
