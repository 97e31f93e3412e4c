//! SQL data access for the planner.
//!
//! All functions take a `&Connection` and are stateless. Ownership is part of
//! every `WHERE` clause that reads a user's rows, so a row belonging to
//! someone else is indistinguishable from a missing one.

mod actions;
mod hierarchy;
mod lists;
mod projects;
mod tasks;

pub use actions::ActionRepository;
pub use hierarchy::{HierarchyRepository, Level};
pub use lists::ListRepository;
pub use projects::ProjectRepository;
pub use tasks::{TaskRepository, TaskWrite};

use rusqlite::{Connection, OptionalExtension};

use waypoint_core::Result;
pub(crate) use waypoint_store::{Changes, placeholders};

/// Owner column of row `id` in an owned table.
///
/// `None` if the row is missing, `Some(None)` if it exists without an owner.
pub fn row_owner(conn: &Connection, table: &'static str, id: &str) -> Result<Option<Option<String>>> {
    let sql = format!("SELECT user_id FROM {table} WHERE id = ?1");
    Ok(conn
        .query_row(&sql, [id], |row| row.get::<_, Option<String>>(0))
        .optional()?)
}
