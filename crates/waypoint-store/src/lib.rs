//! # waypoint-store
//!
//! `SQLite` persistence plumbing shared by the planner and community crates:
//!
//! - [`connection`]: r2d2 pool with WAL, foreign keys, and busy timeout pragmas
//! - [`migrations`]: versioned schema embedded at compile time
//! - [`immediate`]: run a closure inside a `BEGIN IMMEDIATE` transaction
//! - [`Changes`]: partial `UPDATE` builder shared by every repository
//!
//! Repositories elsewhere in the workspace take a plain `&Connection`; a
//! [`rusqlite::Transaction`] derefs to one, so the same repository code runs
//! inside or outside a transaction.

#![deny(unsafe_code)]

mod changes;
pub mod connection;
pub mod errors;
pub mod migrations;
mod tx;

pub use changes::{Changes, placeholders};
pub use connection::{ConnectionConfig, ConnectionPool, PooledConnection};
pub use errors::{Result, StoreError};
pub use migrations::run_migrations;
pub use tx::immediate;
