//! Error types for the storage layer.

use thiserror::Error;
use waypoint_core::DomainError;

/// Errors raised while opening, migrating, or pooling the database.
#[derive(Debug, Error)]
pub enum StoreError {
    /// `SQLite` database error.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Connection pool error.
    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// Schema migration failed.
    #[error("migration error: {message}")]
    Migration {
        /// Describes which migration failed and why.
        message: String,
    },
}

/// Convenience type alias for store results.
pub type Result<T> = std::result::Result<T, StoreError>;

impl From<StoreError> for DomainError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Sqlite(e) => Self::Sqlite(e),
            StoreError::Pool(e) => Self::Pool(e),
            StoreError::Migration { message } => Self::Internal(message),
        }
    }
}
