//! # waypoint-core
//!
//! Foundation types shared by every Waypoint crate:
//!
//! - **Errors**: [`DomainError`] taxonomy with machine-readable [`ErrorCode`]s
//! - **Identity**: [`resolve_actor`] turns request-claimed and authenticated
//!   identities into the acting [`UserId`]
//! - **IDs and time**: prefixed UUID v7 generation and ISO-8601 timestamps
//! - **Patches**: [`nullable`] for absent-vs-null partial update fields
//! - **Logging**: [`logging::init_subscriber`] for the `tracing` subscriber

#![deny(unsafe_code)]

pub mod errors;
pub mod identity;
pub mod ids;
pub mod logging;
pub mod nullable;

pub use errors::{DomainError, ErrorCode, Result};
pub use identity::{UserId, resolve_actor, resolve_claims};
pub use ids::{format_timestamp, generate_id, now_iso, parse_timestamp};
