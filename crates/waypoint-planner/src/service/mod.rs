//! Business rules over the planner repositories.
//!
//! Each public service function is one unit of work: validation runs first,
//! then every write happens inside a single [`waypoint_store::immediate`]
//! transaction. Service functions never call each other's public entry
//! points from inside a transaction.

mod actions;
mod hierarchy;
mod lists;
mod projects;
mod tasks;

pub use actions::ActionService;
pub use hierarchy::{HierarchyService, parse_month};
pub use lists::ListService;
pub use projects::ProjectService;
pub use tasks::TaskService;

use rusqlite::Connection;

use waypoint_core::{DomainError, Result, generate_id};

use crate::repository::row_owner;

/// Reject blank text and text longer than `max` characters.
pub(crate) fn require_text(field: &str, value: &str, max: usize) -> Result<()> {
    if value.trim().is_empty() {
        return Err(DomainError::validation(format!("{field} is required")));
    }
    if value.chars().count() > max {
        return Err(DomainError::validation(format!("{field} must be at most {max} characters")));
    }
    Ok(())
}

/// Same as [`require_text`] for an optional patch field.
pub(crate) fn check_text(field: &str, value: Option<&String>, max: usize) -> Result<()> {
    value.map_or(Ok(()), |v| require_text(field, v, max))
}

/// Pick the ID for an upsert.
///
/// A missing or blank ID gets a fresh one. A supplied ID that already
/// belongs to another user (or to nobody) is reported as not found.
pub(crate) fn upsert_id(
    conn: &Connection,
    table: &'static str,
    user_id: &str,
    requested: Option<&str>,
    prefix: &str,
    entity: &'static str,
) -> Result<String> {
    let Some(id) = requested.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(generate_id(prefix));
    };
    match row_owner(conn, table, id)? {
        Some(Some(owner)) if owner != user_id => Err(DomainError::not_found(entity)),
        Some(None) => Err(DomainError::not_found(entity)),
        _ => Ok(id.to_string()),
    }
}

/// Deduplicate IDs, keeping the first occurrence of each.
pub(crate) fn dedup_ids(ids: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(ids.len());
    for id in ids {
        if !out.contains(id) {
            out.push(id.clone());
        }
    }
    out
}

/// Reject an empty batch.
pub(crate) fn require_ids(ids: &[String]) -> Result<()> {
    if ids.is_empty() || ids.iter().any(|id| id.trim().is_empty()) {
        return Err(DomainError::validation("ids must be a non-empty list of IDs"));
    }
    Ok(())
}
