use rusqlite::{Connection, OptionalExtension, params, params_from_iter};

use waypoint_core::{Result, now_iso};

use super::{ActionRepository, Changes, placeholders};
use crate::types::{Project, ProjectParams, ProjectPatch};

/// Projects and their embedded action lists.
pub struct ProjectRepository;

impl ProjectRepository {
    /// The user's projects with `is_archived` matching, newest first, each with
    /// its actions in order.
    pub fn list_projects(conn: &Connection, user_id: &str, archived: bool) -> Result<Vec<Project>> {
        let mut stmt = conn.prepare(
            "SELECT * FROM projects WHERE user_id = ?1 AND is_archived = ?2
             ORDER BY created_at DESC, id",
        )?;
        let rows = stmt.query_map(params![user_id, archived], |row| Ok(project_from_row(row)))?;
        let mut projects: Vec<Project> = rows.collect::<std::result::Result<_, _>>()?;
        for project in &mut projects {
            project.actions = ActionRepository::list_for_project(conn, &project.id)?;
        }
        Ok(projects)
    }

    /// One of the user's projects with its actions.
    pub fn get_project(conn: &Connection, user_id: &str, id: &str) -> Result<Option<Project>> {
        let project = conn
            .query_row(
                "SELECT * FROM projects WHERE id = ?1 AND user_id = ?2",
                params![id, user_id],
                |row| Ok(project_from_row(row)),
            )
            .optional()?;
        match project {
            Some(mut p) => {
                p.actions = ActionRepository::list_for_project(conn, &p.id)?;
                Ok(Some(p))
            }
            None => Ok(None),
        }
    }

    /// Whether the user owns project `id`.
    pub fn owns(conn: &Connection, user_id: &str, id: &str) -> Result<bool> {
        let found: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM projects WHERE id = ?1 AND user_id = ?2",
                params![id, user_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Title of one of the user's projects.
    pub fn title(conn: &Connection, user_id: &str, id: &str) -> Result<Option<String>> {
        Ok(conn
            .query_row(
                "SELECT title FROM projects WHERE id = ?1 AND user_id = ?2",
                params![id, user_id],
                |row| row.get(0),
            )
            .optional()?)
    }

    /// Insert or replace a project. The archive flag survives replacement.
    pub fn upsert_project(conn: &Connection, user_id: &str, id: &str, p: &ProjectParams) -> Result<()> {
        let now = now_iso();
        let _ = conn.execute(
            "INSERT INTO projects (id, user_id, monthly_goal_id, title, purpose, expected_result,
                                   is_archived, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7, ?7)
             ON CONFLICT(id) DO UPDATE SET
                monthly_goal_id = excluded.monthly_goal_id,
                title = excluded.title,
                purpose = excluded.purpose,
                expected_result = excluded.expected_result,
                updated_at = excluded.updated_at
             WHERE projects.user_id = excluded.user_id",
            params![id, user_id, p.monthly_goal_id, p.title, p.purpose, p.expected_result, now],
        )?;
        Ok(())
    }

    /// Partial project update.
    pub fn update_project(conn: &Connection, user_id: &str, id: &str, patch: &ProjectPatch) -> Result<bool> {
        let mut changes = Changes::new();
        changes.set_some("monthly_goal_id", patch.monthly_goal_id.as_ref());
        changes.set_some("title", patch.title.as_ref());
        changes.set_some("purpose", patch.purpose.as_ref());
        changes.set_some("expected_result", patch.expected_result.as_ref());
        changes.set_some("is_archived", patch.is_archived.as_ref());
        Ok(changes.apply(conn, "projects", id, Some(user_id))?)
    }

    /// Delete one of the user's projects; actions and project tasks cascade.
    pub fn delete_project(conn: &Connection, user_id: &str, id: &str) -> Result<bool> {
        let changed = conn.execute(
            "DELETE FROM projects WHERE id = ?1 AND user_id = ?2",
            params![id, user_id],
        )?;
        Ok(changed > 0)
    }

    /// Delete several of the user's projects.
    pub fn delete_projects(conn: &Connection, user_id: &str, ids: &[String]) -> Result<usize> {
        if ids.is_empty() {
            return Ok(0);
        }
        let sql = format!(
            "DELETE FROM projects WHERE user_id = ? AND id IN ({})",
            placeholders(ids.len())
        );
        let values = std::iter::once(user_id).chain(ids.iter().map(String::as_str));
        Ok(conn.execute(&sql, params_from_iter(values))?)
    }

    /// Flip `is_archived` on each of the user's listed projects.
    pub fn toggle_archived(conn: &Connection, user_id: &str, ids: &[String]) -> Result<usize> {
        if ids.is_empty() {
            return Ok(0);
        }
        let sql = format!(
            "UPDATE projects SET is_archived = 1 - is_archived, updated_at = ?
             WHERE user_id = ? AND id IN ({})",
            placeholders(ids.len())
        );
        let now = now_iso();
        let values = [now.as_str(), user_id]
            .into_iter()
            .chain(ids.iter().map(String::as_str));
        Ok(conn.execute(&sql, params_from_iter(values))?)
    }
}

fn project_from_row(row: &rusqlite::Row<'_>) -> Project {
    let is_archived: i64 = row.get_unwrap("is_archived");
    Project {
        id: row.get_unwrap("id"),
        user_id: row.get_unwrap("user_id"),
        monthly_goal_id: row.get_unwrap("monthly_goal_id"),
        title: row.get_unwrap("title"),
        purpose: row.get_unwrap("purpose"),
        expected_result: row.get_unwrap("expected_result"),
        is_archived: is_archived != 0,
        actions: Vec::new(),
        created_at: row.get_unwrap("created_at"),
        updated_at: row.get_unwrap("updated_at"),
    }
}
