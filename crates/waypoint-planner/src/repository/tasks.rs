use rusqlite::types::ToSql;
use rusqlite::{Connection, OptionalExtension, params, params_from_iter};

use waypoint_core::{Result, now_iso};

use super::{Changes, placeholders};
use crate::types::{ListKind, Task, TaskFilter, TaskView};

const VIEW_SELECT: &str = "SELECT t.*, l.type AS list_type, l.designation AS list_designation,
        p.title AS project_title
     FROM tasks t
     LEFT JOIN lists l ON l.id = t.list_id
     LEFT JOIN projects p ON p.id = t.project_id";

/// Column values for writing a whole task row.
#[derive(Clone, Debug, Default)]
pub struct TaskWrite<'a> {
    /// Containing list.
    pub list_id: Option<&'a str>,
    /// Containing project.
    pub project_id: Option<&'a str>,
    /// Task text.
    pub description: &'a str,
    /// Due date.
    pub deadline: Option<&'a str>,
    /// Time of day.
    pub time: Option<&'a str>,
    /// Recurrence rule.
    pub frequency: Option<&'a serde_json::Value>,
    /// Completion flag.
    pub completed: bool,
    /// Mirrored project action.
    pub linked_action_id: Option<&'a str>,
}

/// Tasks.
pub struct TaskRepository;

impl TaskRepository {
    // ─────────────────────────────────────────────────────────────────────
    // Reads
    // ─────────────────────────────────────────────────────────────────────

    /// One of the user's tasks.
    pub fn get(conn: &Connection, user_id: &str, id: &str) -> Result<Option<Task>> {
        Ok(conn
            .query_row(
                "SELECT * FROM tasks WHERE id = ?1 AND user_id = ?2",
                params![id, user_id],
                |row| Ok(task_from_row(row)),
            )
            .optional()?)
    }

    /// The user's tasks among `ids`, in the order of `ids`.
    pub fn find_many(conn: &Connection, user_id: &str, ids: &[String]) -> Result<Vec<Task>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT * FROM tasks WHERE user_id = ? AND id IN ({})",
            placeholders(ids.len())
        );
        let values = std::iter::once(user_id).chain(ids.iter().map(String::as_str));
        let mut stmt = conn.prepare(&sql)?;
        let found: Vec<Task> = stmt
            .query_map(params_from_iter(values), |row| Ok(task_from_row(row)))?
            .collect::<std::result::Result<_, _>>()?;
        let mut ordered = Vec::with_capacity(found.len());
        for id in ids {
            if let Some(task) = found.iter().find(|t| &t.id == id) {
                if !ordered.iter().any(|t: &Task| &t.id == id) {
                    ordered.push(task.clone());
                }
            }
        }
        Ok(ordered)
    }

    /// One of the user's tasks with list and project context.
    pub fn get_view(conn: &Connection, user_id: &str, id: &str) -> Result<Option<TaskView>> {
        let sql = format!("{VIEW_SELECT} WHERE t.id = ?1 AND t.user_id = ?2");
        Ok(conn
            .query_row(&sql, params![id, user_id], |row| Ok(view_from_row(row)))
            .optional()?)
    }

    /// Filtered listing.
    ///
    /// With `project_id` the rows come in project order (unplaced last), then
    /// newest first; otherwise newest first.
    pub fn list(conn: &Connection, user_id: &str, filter: &TaskFilter) -> Result<Vec<TaskView>> {
        let mut conditions: Vec<String> = vec!["t.user_id = ?".to_string()];
        let mut values: Vec<Box<dyn ToSql>> = vec![Box::new(user_id.to_string())];

        if let Some(completed) = filter.completed {
            conditions.push("t.completed = ?".to_string());
            values.push(Box::new(completed));
        }
        if let Some(ref list_id) = filter.list_id {
            conditions.push("t.list_id = ?".to_string());
            values.push(Box::new(list_id.clone()));
        }
        if let Some(ref project_id) = filter.project_id {
            conditions.push("t.project_id = ?".to_string());
            values.push(Box::new(project_id.clone()));
        }
        if let Some(kind) = filter.list_type {
            conditions.push("l.type = ?".to_string());
            values.push(Box::new(kind.as_sql()));
        }

        let order = if filter.project_id.is_some() {
            "t.order_index IS NULL, t.order_index ASC, t.created_at DESC"
        } else {
            "t.created_at DESC, t.id DESC"
        };
        let sql = format!("{VIEW_SELECT} WHERE {} ORDER BY {order}", conditions.join(" AND "));
        let params_refs: Vec<&dyn ToSql> = values.iter().map(AsRef::as_ref).collect();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_refs.as_slice(), |row| Ok(view_from_row(row)))?;
        Ok(rows.collect::<std::result::Result<_, _>>()?)
    }

    /// Tasks that sit in a list (dual-attached ones included), newest first.
    pub fn list_only(conn: &Connection, user_id: &str) -> Result<Vec<TaskView>> {
        let sql = format!("{VIEW_SELECT} WHERE t.user_id = ?1 AND t.list_id IS NOT NULL ORDER BY t.created_at DESC");
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![user_id], |row| Ok(view_from_row(row)))?;
        Ok(rows.collect::<std::result::Result<_, _>>()?)
    }

    /// Tasks that sit in a project, grouped by project in project order.
    pub fn project_only(conn: &Connection, user_id: &str) -> Result<Vec<TaskView>> {
        let sql = format!(
            "{VIEW_SELECT} WHERE t.user_id = ?1 AND t.project_id IS NOT NULL
             ORDER BY t.project_id, t.order_index IS NULL, t.order_index ASC, t.created_at DESC"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![user_id], |row| Ok(view_from_row(row)))?;
        Ok(rows.collect::<std::result::Result<_, _>>()?)
    }

    /// The task mirroring a project action, if any.
    pub fn mirror_of(conn: &Connection, action_id: &str) -> Result<Option<Task>> {
        Ok(conn
            .query_row(
                "SELECT * FROM tasks WHERE linked_action_id = ?1 ORDER BY created_at ASC LIMIT 1",
                params![action_id],
                |row| Ok(task_from_row(row)),
            )
            .optional()?)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Writes
    // ─────────────────────────────────────────────────────────────────────

    /// Insert an unplaced task.
    pub fn insert(conn: &Connection, user_id: &str, id: &str, w: &TaskWrite<'_>) -> Result<()> {
        let now = now_iso();
        let frequency = w.frequency.map(serde_json::to_string).transpose()?;
        let _ = conn.execute(
            "INSERT INTO tasks (id, user_id, list_id, project_id, description, order_index,
                                deadline, time, frequency, completed, linked_action_id,
                                created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, NULL, ?6, ?7, ?8, ?9, ?10, ?11, ?11)",
            params![
                id,
                user_id,
                w.list_id,
                w.project_id,
                w.description,
                w.deadline,
                w.time,
                frequency,
                w.completed,
                w.linked_action_id,
                now,
            ],
        )?;
        Ok(())
    }

    /// Overwrite every writable column of an existing task. The task keeps
    /// its position if it stays in the same project and is unplaced
    /// otherwise. An existing mirror link is kept unless `w` names a new one.
    pub fn overwrite(conn: &Connection, id: &str, w: &TaskWrite<'_>) -> Result<()> {
        let frequency = w.frequency.map(serde_json::to_string).transpose()?;
        let _ = conn.execute(
            "UPDATE tasks SET list_id = ?2, project_id = ?3, description = ?4,
                              order_index = CASE WHEN project_id IS ?3 THEN order_index END,
                              deadline = ?5, time = ?6, frequency = ?7, completed = ?8,
                              linked_action_id = COALESCE(?9, linked_action_id), updated_at = ?10
             WHERE id = ?1",
            params![
                id,
                w.list_id,
                w.project_id,
                w.description,
                w.deadline,
                w.time,
                frequency,
                w.completed,
                w.linked_action_id,
                now_iso(),
            ],
        )?;
        Ok(())
    }

    /// Set list and project together; the task leaves any ordering.
    pub fn set_attachment(conn: &Connection, id: &str, list_id: Option<&str>, project_id: Option<&str>) -> Result<()> {
        let _ = conn.execute(
            "UPDATE tasks SET list_id = ?2, project_id = ?3, order_index = NULL, updated_at = ?4 WHERE id = ?1",
            params![id, list_id, project_id, now_iso()],
        )?;
        Ok(())
    }

    /// Set or clear the list only, leaving project and position alone.
    pub fn set_list(conn: &Connection, id: &str, list_id: Option<&str>) -> Result<()> {
        let _ = conn.execute(
            "UPDATE tasks SET list_id = ?2, updated_at = ?3 WHERE id = ?1",
            params![id, list_id, now_iso()],
        )?;
        Ok(())
    }

    /// Clear deadline, time, and frequency (entry lists carry none).
    pub fn clear_schedule(conn: &Connection, id: &str) -> Result<()> {
        let _ = conn.execute(
            "UPDATE tasks SET deadline = NULL, time = NULL, frequency = NULL, updated_at = ?2 WHERE id = ?1",
            params![id, now_iso()],
        )?;
        Ok(())
    }

    /// Update plain fields. Outer `None` leaves a column alone; `Some(None)`
    /// clears it.
    pub fn update_fields(
        conn: &Connection,
        id: &str,
        description: Option<&String>,
        completed: Option<bool>,
        deadline: Option<Option<&String>>,
        time: Option<Option<&String>>,
        frequency: Option<Option<&serde_json::Value>>,
    ) -> Result<bool> {
        let mut changes = Changes::new();
        changes.set_some("description", description);
        changes.set_some("completed", completed.as_ref());
        if let Some(deadline) = deadline {
            changes.set("deadline", deadline.cloned());
        }
        if let Some(time) = time {
            changes.set("time", time.cloned());
        }
        if let Some(frequency) = frequency {
            changes.set("frequency", frequency.map(serde_json::to_string).transpose()?);
        }
        Ok(changes.apply(conn, "tasks", id, None)?)
    }

    /// Flip the completion flag.
    pub fn toggle(conn: &Connection, id: &str) -> Result<()> {
        let _ = conn.execute(
            "UPDATE tasks SET completed = 1 - completed, updated_at = ?2 WHERE id = ?1",
            params![id, now_iso()],
        )?;
        Ok(())
    }

    /// Copy an action's text and flag onto every task mirroring it.
    pub fn propagate_from_action(conn: &Connection, action_id: &str, description: &str, is_done: bool) -> Result<usize> {
        Ok(conn.execute(
            "UPDATE tasks SET description = ?2, completed = ?3, updated_at = ?4 WHERE linked_action_id = ?1",
            params![action_id, description, is_done, now_iso()],
        )?)
    }

    /// Delete one of the user's tasks.
    pub fn delete(conn: &Connection, user_id: &str, id: &str) -> Result<bool> {
        let changed = conn.execute("DELETE FROM tasks WHERE id = ?1 AND user_id = ?2", params![id, user_id])?;
        Ok(changed > 0)
    }

    /// Delete the listed tasks the user owns.
    pub fn delete_many(conn: &Connection, user_id: &str, ids: &[String]) -> Result<usize> {
        if ids.is_empty() {
            return Ok(0);
        }
        let sql = format!("DELETE FROM tasks WHERE user_id = ? AND id IN ({})", placeholders(ids.len()));
        let values = std::iter::once(user_id).chain(ids.iter().map(String::as_str));
        Ok(conn.execute(&sql, params_from_iter(values))?)
    }
}

pub(crate) fn task_from_row(row: &rusqlite::Row<'_>) -> Task {
    let completed: i64 = row.get_unwrap("completed");
    let frequency: Option<String> = row.get_unwrap("frequency");
    Task {
        id: row.get_unwrap("id"),
        user_id: row.get_unwrap("user_id"),
        list_id: row.get_unwrap("list_id"),
        project_id: row.get_unwrap("project_id"),
        description: row.get_unwrap("description"),
        order_index: row.get_unwrap("order_index"),
        deadline: row.get_unwrap("deadline"),
        time: row.get_unwrap("time"),
        frequency: frequency.and_then(|s| serde_json::from_str(&s).ok()),
        completed: completed != 0,
        linked_action_id: row.get_unwrap("linked_action_id"),
        created_at: row.get_unwrap("created_at"),
        updated_at: row.get_unwrap("updated_at"),
    }
}

fn view_from_row(row: &rusqlite::Row<'_>) -> TaskView {
    let list_type: Option<String> = row.get_unwrap("list_type");
    TaskView {
        task: task_from_row(row),
        list_type: list_type.as_deref().map(ListKind::from_sql),
        list_designation: row.get_unwrap("list_designation"),
        project_title: row.get_unwrap("project_title"),
    }
}
