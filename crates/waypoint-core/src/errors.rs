//! Domain error taxonomy.
//!
//! Every service in the workspace returns [`DomainError`]. Typed failures
//! (identity, ownership, state, validation) are raised close to the entry
//! point before any mutation starts. Storage and serialization failures are
//! wrapped and surface as [`ErrorCode::InternalError`].

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// ─────────────────────────────────────────────────────────────────────────────
// Error codes
// ─────────────────────────────────────────────────────────────────────────────

/// Machine-readable error codes carried in error responses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    /// No identity could be resolved for the request.
    #[serde(rename = "IDENTITY_REQUIRED")]
    IdentityRequired,
    /// The claimed identity conflicts with the authenticated one.
    #[serde(rename = "IDENTITY_MISMATCH")]
    IdentityMismatch,
    /// The caller lacks the role or ownership for the operation.
    #[serde(rename = "PERMISSION_DENIED")]
    PermissionDenied,
    /// Entity missing or owned by someone else.
    #[serde(rename = "NOT_FOUND")]
    NotFound,
    /// The entity is not in a state that allows the operation.
    #[serde(rename = "INVALID_STATE_TRANSITION")]
    InvalidStateTransition,
    /// Missing or malformed input.
    #[serde(rename = "VALIDATION_FAILED")]
    ValidationFailed,
    /// Unexpected failure.
    #[serde(rename = "INTERNAL_ERROR")]
    InternalError,
}

impl ErrorCode {
    /// Return the string representation of this error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IdentityRequired => "IDENTITY_REQUIRED",
            Self::IdentityMismatch => "IDENTITY_MISMATCH",
            Self::PermissionDenied => "PERMISSION_DENIED",
            Self::NotFound => "NOT_FOUND",
            Self::InvalidStateTransition => "INVALID_STATE_TRANSITION",
            Self::ValidationFailed => "VALIDATION_FAILED",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// HTTP status code for this error.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::IdentityRequired => 401,
            Self::IdentityMismatch | Self::PermissionDenied => 403,
            Self::NotFound => 404,
            Self::InvalidStateTransition | Self::ValidationFailed => 422,
            Self::InternalError => 500,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// DomainError
// ─────────────────────────────────────────────────────────────────────────────

/// Errors returned by Waypoint services.
#[derive(Debug, Error)]
pub enum DomainError {
    /// No session and no explicit identity.
    #[error("identity required")]
    IdentityRequired,

    /// Explicit identity differs from the authenticated session.
    #[error("identity mismatch")]
    IdentityMismatch,

    /// Role or ownership check failed on an entity the caller can see.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Entity does not exist or does not belong to the caller.
    #[error("{entity} not found")]
    NotFound {
        /// Human-readable entity kind.
        entity: &'static str,
    },

    /// Operation not allowed in the entity's current state.
    #[error("{0}")]
    InvalidStateTransition(String),

    /// A batch operation was refused because some members are ineligible.
    #[error("{message}")]
    Blocked {
        /// Why the batch was refused.
        message: String,
        /// IDs of the ineligible members.
        ids: Vec<String>,
    },

    /// Missing or malformed input.
    #[error("validation failed: {0}")]
    Validation(String),

    /// `SQLite` error.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Connection pool error.
    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// JSON serialization error.
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Internal error (e.g. a failed blocking task).
    #[error("internal error: {0}")]
    Internal(String),
}

impl DomainError {
    /// Not-found error for an entity kind.
    pub fn not_found(entity: &'static str) -> Self {
        Self::NotFound { entity }
    }

    /// Permission error with a message.
    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::PermissionDenied(message.into())
    }

    /// Invalid state transition with a message.
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidStateTransition(message.into())
    }

    /// Validation failure with a message.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Get the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::IdentityRequired => ErrorCode::IdentityRequired,
            Self::IdentityMismatch => ErrorCode::IdentityMismatch,
            Self::PermissionDenied(_) => ErrorCode::PermissionDenied,
            Self::NotFound { .. } => ErrorCode::NotFound,
            Self::InvalidStateTransition(_) | Self::Blocked { .. } => {
                ErrorCode::InvalidStateTransition
            }
            Self::Validation(_) => ErrorCode::ValidationFailed,
            Self::Sqlite(_) | Self::Pool(_) | Self::Serde(_) | Self::Internal(_) => {
                ErrorCode::InternalError
            }
        }
    }

    /// Whether this error hides an unexpected failure.
    pub fn is_internal(&self) -> bool {
        self.code() == ErrorCode::InternalError
    }
}

/// Convenience type alias for domain results.
pub type Result<T> = std::result::Result<T, DomainError>;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
