use rusqlite::{Connection, OptionalExtension, params, params_from_iter};

use waypoint_core::{Result, now_iso};

use super::{Changes, placeholders};
use crate::types::{ListKind, ListParams, ListPatch, TaskList};

/// Task lists.
pub struct ListRepository;

impl ListRepository {
    /// The user's lists, newest first.
    pub fn list(conn: &Connection, user_id: &str) -> Result<Vec<TaskList>> {
        let mut stmt = conn.prepare("SELECT * FROM lists WHERE user_id = ?1 ORDER BY created_at DESC, id")?;
        let rows = stmt.query_map(params![user_id], |row| Ok(list_from_row(row)))?;
        Ok(rows.collect::<std::result::Result<_, _>>()?)
    }

    /// One of the user's lists.
    pub fn get(conn: &Connection, user_id: &str, id: &str) -> Result<Option<TaskList>> {
        Ok(conn
            .query_row(
                "SELECT * FROM lists WHERE id = ?1 AND user_id = ?2",
                params![id, user_id],
                |row| Ok(list_from_row(row)),
            )
            .optional()?)
    }

    /// The user's oldest action list.
    pub fn first_action_list(conn: &Connection, user_id: &str) -> Result<Option<TaskList>> {
        Ok(conn
            .query_row(
                "SELECT * FROM lists WHERE user_id = ?1 AND type = 'action'
                 ORDER BY created_at ASC, id ASC LIMIT 1",
                params![user_id],
                |row| Ok(list_from_row(row)),
            )
            .optional()?)
    }

    /// Insert or replace a list.
    pub fn upsert(conn: &Connection, user_id: &str, id: &str, p: &ListParams) -> Result<()> {
        let now = now_iso();
        let _ = conn.execute(
            "INSERT INTO lists (id, user_id, designation, type, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)
             ON CONFLICT(id) DO UPDATE SET
                designation = excluded.designation,
                type = excluded.type,
                updated_at = excluded.updated_at
             WHERE lists.user_id = excluded.user_id",
            params![id, user_id, p.designation, p.kind.as_sql(), now],
        )?;
        Ok(())
    }

    /// Partial list update.
    pub fn update(conn: &Connection, user_id: &str, id: &str, patch: &ListPatch) -> Result<bool> {
        let mut changes = Changes::new();
        changes.set_some("designation", patch.designation.as_ref());
        if let Some(kind) = patch.kind {
            changes.set("type", kind.as_sql());
        }
        Ok(changes.apply(conn, "lists", id, Some(user_id))?)
    }

    /// Delete the listed lists the user owns, together with the tasks that
    /// live only in them. Tasks also attached to a project keep the project.
    pub fn delete_many(conn: &Connection, user_id: &str, ids: &[String]) -> Result<usize> {
        if ids.is_empty() {
            return Ok(0);
        }
        let marks = placeholders(ids.len());
        let values = || std::iter::once(user_id).chain(ids.iter().map(String::as_str));
        let orphans = format!(
            "DELETE FROM tasks WHERE user_id = ? AND project_id IS NULL AND list_id IN ({marks})"
        );
        let _ = conn.execute(&orphans, params_from_iter(values()))?;
        let lists = format!("DELETE FROM lists WHERE user_id = ? AND id IN ({marks})");
        Ok(conn.execute(&lists, params_from_iter(values()))?)
    }
}

pub(crate) fn list_from_row(row: &rusqlite::Row<'_>) -> TaskList {
    let kind: String = row.get_unwrap("type");
    TaskList {
        id: row.get_unwrap("id"),
        user_id: row.get_unwrap("user_id"),
        designation: row.get_unwrap("designation"),
        kind: ListKind::from_sql(&kind),
        created_at: row.get_unwrap("created_at"),
        updated_at: row.get_unwrap("updated_at"),
    }
}
