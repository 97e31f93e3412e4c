use rusqlite::{Connection, OptionalExtension, params, params_from_iter};

use waypoint_core::{Result, now_iso};

use super::placeholders;
use crate::types::ProjectAction;

/// Project actions. Ownership is inherited from the project.
pub struct ActionRepository;

impl ActionRepository {
    /// Actions of one project, by `order_index` (unplaced last).
    pub fn list_for_project(conn: &Connection, project_id: &str) -> Result<Vec<ProjectAction>> {
        let mut stmt = conn.prepare(
            "SELECT * FROM project_actions WHERE project_id = ?1
             ORDER BY order_index IS NULL, order_index ASC, created_at ASC",
        )?;
        let rows = stmt.query_map(params![project_id], |row| Ok(action_from_row(row)))?;
        Ok(rows.collect::<std::result::Result<_, _>>()?)
    }

    /// Actions across the user's projects, or within one of them.
    pub fn list_owned(conn: &Connection, user_id: &str, project_id: Option<&str>) -> Result<Vec<ProjectAction>> {
        let mut stmt = conn.prepare(
            "SELECT a.* FROM project_actions a
             JOIN projects p ON p.id = a.project_id
             WHERE p.user_id = ?1 AND (?2 IS NULL OR a.project_id = ?2)
             ORDER BY a.project_id, a.order_index IS NULL, a.order_index ASC, a.created_at ASC",
        )?;
        let rows = stmt.query_map(params![user_id, project_id], |row| Ok(action_from_row(row)))?;
        Ok(rows.collect::<std::result::Result<_, _>>()?)
    }

    /// An action whose project belongs to the user.
    pub fn get_owned(conn: &Connection, user_id: &str, id: &str) -> Result<Option<ProjectAction>> {
        Ok(conn
            .query_row(
                "SELECT a.* FROM project_actions a
                 JOIN projects p ON p.id = a.project_id
                 WHERE a.id = ?1 AND p.user_id = ?2",
                params![id, user_id],
                |row| Ok(action_from_row(row)),
            )
            .optional()?)
    }

    /// Whether an action with this ID exists at all.
    pub fn exists(conn: &Connection, id: &str) -> Result<bool> {
        let found: Option<i64> = conn
            .query_row("SELECT 1 FROM project_actions WHERE id = ?1", params![id], |row| row.get(0))
            .optional()?;
        Ok(found.is_some())
    }

    /// Insert an unplaced action.
    pub fn insert(conn: &Connection, id: &str, project_id: &str, description: &str, is_done: bool) -> Result<()> {
        let now = now_iso();
        let _ = conn.execute(
            "INSERT INTO project_actions (id, project_id, description, order_index, is_done, created_at, updated_at)
             VALUES (?1, ?2, ?3, NULL, ?4, ?5, ?5)",
            params![id, project_id, description, is_done, now],
        )?;
        Ok(())
    }

    /// Overwrite the text, flag, and project of an existing action. It keeps
    /// its position within the same project and is unplaced on a move.
    pub fn replace(conn: &Connection, id: &str, project_id: &str, description: &str, is_done: bool) -> Result<()> {
        let _ = conn.execute(
            "UPDATE project_actions
             SET project_id = ?2, description = ?3, is_done = ?4,
                 order_index = CASE WHEN project_id = ?2 THEN order_index END, updated_at = ?5
             WHERE id = ?1",
            params![id, project_id, description, is_done, now_iso()],
        )?;
        Ok(())
    }

    /// Set description and/or done flag.
    pub fn set_fields(conn: &Connection, id: &str, description: Option<&str>, is_done: Option<bool>) -> Result<()> {
        let _ = conn.execute(
            "UPDATE project_actions
             SET description = COALESCE(?2, description),
                 is_done = COALESCE(?3, is_done),
                 updated_at = ?4
             WHERE id = ?1",
            params![id, description, is_done, now_iso()],
        )?;
        Ok(())
    }

    /// Delete one action; mirrored tasks cascade.
    pub fn delete(conn: &Connection, id: &str) -> Result<bool> {
        Ok(conn.execute("DELETE FROM project_actions WHERE id = ?1", params![id])? > 0)
    }

    /// Delete the listed actions that belong to the user's projects.
    pub fn delete_owned_many(conn: &Connection, user_id: &str, ids: &[String]) -> Result<usize> {
        if ids.is_empty() {
            return Ok(0);
        }
        let sql = format!(
            "DELETE FROM project_actions
             WHERE project_id IN (SELECT id FROM projects WHERE user_id = ?)
               AND id IN ({})",
            placeholders(ids.len())
        );
        let values = std::iter::once(user_id).chain(ids.iter().map(String::as_str));
        Ok(conn.execute(&sql, params_from_iter(values))?)
    }
}

fn action_from_row(row: &rusqlite::Row<'_>) -> ProjectAction {
    let is_done: i64 = row.get_unwrap("is_done");
    ProjectAction {
        id: row.get_unwrap("id"),
        project_id: row.get_unwrap("project_id"),
        description: row.get_unwrap("description"),
        order_index: row.get_unwrap("order_index"),
        is_done: is_done != 0,
        created_at: row.get_unwrap("created_at"),
        updated_at: row.get_unwrap("updated_at"),
    }
}
