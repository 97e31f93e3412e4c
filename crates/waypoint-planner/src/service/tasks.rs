//! Task attachment and ordering rules.
//!
//! A task lives in a list or in a project. The only way to hold both is
//! [`TaskService::link_to_action_list`], which adds an action list to a
//! project task. Project tasks are ordered through [`crate::ordering`];
//! list tasks are ordered by creation time only.
//!
//! Tasks in entry lists never carry a deadline, time, or frequency.

use rusqlite::Connection;
use tracing::{debug, info};

use waypoint_core::{DomainError, Result, UserId};
use waypoint_store::immediate;

use super::{check_text, dedup_ids, require_ids, require_text, upsert_id};
use crate::ordering::{self, Sequence};
use crate::repository::{ListRepository, ProjectRepository, TaskRepository, TaskWrite};
use crate::types::{ListKind, MovedToList, Task, TaskFilter, TaskList, TaskParams, TaskPatch, TaskView};

const DESCRIPTION_MAX: usize = 255;

/// Tasks in lists and projects.
pub struct TaskService;

impl TaskService {
    // ─────────────────────────────────────────────────────────────────────
    // Reads
    // ─────────────────────────────────────────────────────────────────────

    /// Filtered listing of the user's tasks.
    pub fn list(conn: &Connection, user: &UserId, filter: &TaskFilter) -> Result<Vec<TaskView>> {
        TaskRepository::list(conn, user, filter)
    }

    /// One task with its list and project context.
    pub fn get(conn: &Connection, user: &UserId, id: &str) -> Result<TaskView> {
        TaskRepository::get_view(conn, user, id)?.ok_or_else(|| DomainError::not_found("task"))
    }

    /// Tasks in lists, annotated with the project title when dual-attached.
    pub fn list_only(conn: &Connection, user: &UserId) -> Result<Vec<TaskView>> {
        TaskRepository::list_only(conn, user)
    }

    /// Tasks in projects, annotated with the list name when dual-attached.
    pub fn project_only(conn: &Connection, user: &UserId) -> Result<Vec<TaskView>> {
        TaskRepository::project_only(conn, user)
    }

    /// Tasks of one of the user's projects in project order. The rest of
    /// `filter` applies as in [`TaskService::list`]; its `project_id` is
    /// ignored.
    pub fn for_project(conn: &Connection, user: &UserId, project_id: &str, filter: &TaskFilter) -> Result<Vec<TaskView>> {
        if !ProjectRepository::owns(conn, user, project_id)? {
            return Err(DomainError::not_found("project"));
        }
        let filter = TaskFilter {
            project_id: Some(project_id.to_string()),
            ..filter.clone()
        };
        TaskRepository::list(conn, user, &filter)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Create / update
    // ─────────────────────────────────────────────────────────────────────

    /// Create or replace a task.
    ///
    /// Exactly one of `list_id` and `project_id` must be given. A new
    /// project task goes to the end of the project, or to `order_index` with
    /// the tasks from there on shifted up. Replacing a task that stays in its
    /// project keeps its position unless `order_index` says otherwise.
    pub fn store(conn: &Connection, user: &UserId, params: &TaskParams) -> Result<Task> {
        require_text("description", &params.description, DESCRIPTION_MAX)?;
        match (&params.list_id, &params.project_id) {
            (None, None) => return Err(DomainError::validation("a task needs a list_id or a project_id")),
            (Some(_), Some(_)) => {
                return Err(DomainError::validation(
                    "a task belongs to a list or a project, not both; link it to an action list instead",
                ));
            }
            _ => {}
        }
        if params.order_index.is_some() && params.project_id.is_none() {
            return Err(DomainError::invalid_state("order_index only applies to tasks in a project"));
        }
        if params.order_index.is_some_and(|k| k < 0) {
            return Err(DomainError::validation("order_index must be zero or greater"));
        }

        immediate(conn, |tx| {
            let list = params.list_id.as_deref().map(|l| owned_list(tx, user, l)).transpose()?;
            if let Some(ref project_id) = params.project_id {
                require_project(tx, user, project_id)?;
            }
            let schedulable = list.as_ref().is_none_or(|l| l.kind == ListKind::Action);
            let write = TaskWrite {
                list_id: params.list_id.as_deref(),
                project_id: params.project_id.as_deref(),
                description: &params.description,
                deadline: params.deadline.as_deref().filter(|_| schedulable),
                time: params.time.as_deref().filter(|_| schedulable),
                frequency: params.frequency.as_ref().filter(|_| schedulable),
                completed: params.completed,
                linked_action_id: None,
            };

            let id = upsert_id(tx, "tasks", user, params.id.as_deref(), "task", "task")?;
            if TaskRepository::get(tx, user, &id)?.is_some() {
                TaskRepository::overwrite(tx, &id, &write)?;
            } else {
                TaskRepository::insert(tx, user, &id, &write)?;
            }

            if let Some(ref project_id) = params.project_id {
                let seq = Sequence::ProjectTasks { user_id: user, project_id };
                let index = match (params.order_index, ordering::index_of(tx, seq, &id)?) {
                    (Some(k), _) => ordering::place(tx, seq, &id, k)?,
                    (None, Some(kept)) => kept,
                    (None, None) => ordering::append(tx, seq, &id)?,
                };
                debug!(task_id = %id, project_id = %project_id, index, "task placed");
            }
            info!(user_id = %user, task_id = %id, "task stored");
            fetch(tx, user, &id)
        })
    }

    /// Partial update.
    ///
    /// `list_id`, `project_id`, and `order_index` distinguish "absent" from
    /// `null`. The result must still be attached to something, and may only
    /// hold both a list and a project if it already did and the list is an
    /// action list.
    pub fn update(conn: &Connection, user: &UserId, id: &str, patch: &TaskPatch) -> Result<Task> {
        check_text("description", patch.description.as_ref(), DESCRIPTION_MAX)?;
        if let Some(Some(k)) = patch.order_index {
            if k < 0 {
                return Err(DomainError::validation("order_index must be zero or greater"));
            }
        }

        immediate(conn, |tx| {
            let current = fetch(tx, user, id)?;
            let list_id = patch.list_id.clone().unwrap_or_else(|| current.list_id.clone());
            let project_id = patch.project_id.clone().unwrap_or_else(|| current.project_id.clone());

            let list = list_id.as_deref().map(|l| owned_list(tx, user, l)).transpose()?;
            if let Some(ref p) = project_id {
                if project_id != current.project_id {
                    require_project(tx, user, p)?;
                }
            }

            match (&list, &project_id) {
                (None, None) => return Err(DomainError::validation("a task needs a list or a project")),
                (Some(l), Some(_)) if !(current.is_dual_attached() && l.kind == ListKind::Action) => {
                    return Err(DomainError::validation(
                        "a task belongs to a list or a project, not both; link it to an action list instead",
                    ));
                }
                _ => {}
            }
            match (patch.order_index, &project_id) {
                (Some(Some(_)), None) => {
                    return Err(DomainError::invalid_state("order_index only applies to tasks in a project"));
                }
                (Some(None), Some(_)) => {
                    return Err(DomainError::validation("tasks in a project need an order_index"));
                }
                _ => {}
            }

            let _ = TaskRepository::update_fields(
                tx,
                id,
                patch.description.as_ref(),
                patch.completed,
                patch.deadline.as_ref().map(Option::as_ref),
                patch.time.as_ref().map(Option::as_ref),
                patch.frequency.as_ref().map(Option::as_ref),
            )?;

            let project_changed = project_id != current.project_id;
            if project_changed {
                TaskRepository::set_attachment(tx, id, list_id.as_deref(), project_id.as_deref())?;
            } else if list_id != current.list_id {
                TaskRepository::set_list(tx, id, list_id.as_deref())?;
            }

            if let Some(ref p) = project_id {
                let seq = Sequence::ProjectTasks { user_id: user, project_id: p };
                match patch.order_index {
                    Some(Some(k)) => {
                        let _ = ordering::place(tx, seq, id, k)?;
                    }
                    _ if project_changed || current.order_index.is_none() => {
                        let _ = ordering::append(tx, seq, id)?;
                    }
                    _ => {}
                }
            }

            if list.is_some_and(|l| l.kind == ListKind::Entry) {
                TaskRepository::clear_schedule(tx, id)?;
            }
            debug!(user_id = %user, task_id = %id, project_changed, "task updated");
            fetch(tx, user, id)
        })
    }

    /// Flip the completion flag.
    pub fn toggle(conn: &Connection, user: &UserId, id: &str) -> Result<Task> {
        immediate(conn, |tx| {
            let _ = fetch(tx, user, id)?;
            TaskRepository::toggle(tx, id)?;
            fetch(tx, user, id)
        })
    }

    /// Delete a task. The gap it leaves in its project is kept.
    pub fn destroy(conn: &Connection, user: &UserId, id: &str) -> Result<()> {
        immediate(conn, |tx| {
            if !TaskRepository::delete(tx, user, id)? {
                return Err(DomainError::not_found("task"));
            }
            info!(user_id = %user, task_id = %id, "task deleted");
            Ok(())
        })
    }

    /// Delete several tasks; returns how many were deleted.
    pub fn destroy_many(conn: &Connection, user: &UserId, ids: &[String]) -> Result<usize> {
        require_ids(ids)?;
        let ids = dedup_ids(ids);
        immediate(conn, |tx| {
            let deleted = TaskRepository::delete_many(tx, user, &ids)?;
            if deleted == 0 {
                return Err(DomainError::not_found("task"));
            }
            info!(user_id = %user, deleted, "tasks deleted");
            Ok(deleted)
        })
    }

    // ─────────────────────────────────────────────────────────────────────
    // Moves
    // ─────────────────────────────────────────────────────────────────────

    /// Move a list task to another of the user's lists.
    pub fn move_to_list(conn: &Connection, user: &UserId, id: &str, list_id: &str) -> Result<Task> {
        immediate(conn, |tx| {
            let task = fetch(tx, user, id)?;
            if task.project_id.is_some() {
                return Err(DomainError::invalid_state(
                    "project tasks cannot be moved to a list; link them to an action list instead",
                ));
            }
            let list = owned_list(tx, user, list_id)?;
            TaskRepository::set_list(tx, id, Some(&list.id))?;
            if list.kind == ListKind::Entry {
                TaskRepository::clear_schedule(tx, id)?;
            }
            debug!(task_id = %id, list_id = %list.id, "task moved to list");
            fetch(tx, user, id)
        })
    }

    /// Move several list tasks to one list. Refused as a whole if any of
    /// them belongs to a project.
    pub fn move_many_to_list(conn: &Connection, user: &UserId, ids: &[String], list_id: &str) -> Result<MovedToList> {
        require_ids(ids)?;
        let ids = dedup_ids(ids);
        immediate(conn, |tx| {
            let list = owned_list(tx, user, list_id)?;
            let tasks = TaskRepository::find_many(tx, user, &ids)?;
            if tasks.is_empty() {
                return Err(DomainError::not_found("task"));
            }
            let blocked: Vec<String> = tasks
                .iter()
                .filter(|t| t.project_id.is_some())
                .map(|t| t.id.clone())
                .collect();
            if !blocked.is_empty() {
                return Err(DomainError::Blocked {
                    message: "project tasks cannot be moved to a list".to_string(),
                    ids: blocked,
                });
            }
            for task in &tasks {
                TaskRepository::set_list(tx, &task.id, Some(&list.id))?;
                if list.kind == ListKind::Entry {
                    TaskRepository::clear_schedule(tx, &task.id)?;
                }
            }
            info!(user_id = %user, list_id = %list.id, moved = tasks.len(), "tasks moved to list");
            Ok(MovedToList {
                moved_count: tasks.len(),
                list,
            })
        })
    }

    /// Move a project task within its project or to another project.
    ///
    /// Without `order_index` a task changing project goes to the end of the
    /// destination; a task staying put keeps its position.
    pub fn move_to_project(
        conn: &Connection,
        user: &UserId,
        id: &str,
        project_id: &str,
        order_index: Option<i64>,
    ) -> Result<Task> {
        if order_index.is_some_and(|k| k < 0) {
            return Err(DomainError::validation("order_index must be zero or greater"));
        }
        immediate(conn, |tx| {
            let task = fetch(tx, user, id)?;
            let Some(current_project) = task.project_id.as_deref() else {
                return Err(DomainError::invalid_state("list tasks cannot be moved to a project"));
            };
            require_project(tx, user, project_id)?;

            let seq = Sequence::ProjectTasks { user_id: user, project_id };
            let same_project = current_project == project_id;
            if !same_project {
                TaskRepository::set_attachment(tx, id, task.list_id.as_deref(), Some(project_id))?;
            }
            let index = match order_index {
                Some(k) => Some(ordering::place(tx, seq, id, k)?),
                None if !same_project || task.order_index.is_none() => Some(ordering::append(tx, seq, id)?),
                None => task.order_index,
            };
            debug!(task_id = %id, project_id, ?index, same_project, "task moved in project");
            fetch(tx, user, id)
        })
    }

    /// Move several project tasks into one project as a consecutive block in
    /// the order given. The block starts at `start` (shifting the tasks from
    /// there on) or after the current last task.
    pub fn move_many_to_project(
        conn: &Connection,
        user: &UserId,
        ids: &[String],
        project_id: &str,
        start: Option<i64>,
    ) -> Result<Vec<Task>> {
        require_ids(ids)?;
        if start.is_some_and(|k| k < 0) {
            return Err(DomainError::validation("order_index must be zero or greater"));
        }
        let ids = dedup_ids(ids);
        immediate(conn, |tx| {
            require_project(tx, user, project_id)?;
            let tasks = TaskRepository::find_many(tx, user, &ids)?;
            if tasks.is_empty() {
                return Err(DomainError::not_found("task"));
            }
            let blocked: Vec<String> = tasks
                .iter()
                .filter(|t| t.project_id.is_none())
                .map(|t| t.id.clone())
                .collect();
            if !blocked.is_empty() {
                return Err(DomainError::Blocked {
                    message: "list tasks cannot be moved to a project".to_string(),
                    ids: blocked,
                });
            }

            for task in &tasks {
                if task.project_id.as_deref() != Some(project_id) {
                    TaskRepository::set_attachment(tx, &task.id, task.list_id.as_deref(), Some(project_id))?;
                }
            }
            let block: Vec<String> = tasks.into_iter().map(|t| t.id).collect();
            let seq = Sequence::ProjectTasks { user_id: user, project_id };
            let first = ordering::place_block(tx, seq, &block, start)?;
            info!(user_id = %user, project_id, moved = block.len(), first, "tasks moved to project");
            TaskRepository::find_many(tx, user, &block)
        })
    }

    /// Add an action list to a project task, keeping its project.
    ///
    /// Without `list_id` the user's oldest action list is used.
    pub fn link_to_action_list(conn: &Connection, user: &UserId, id: &str, list_id: Option<&str>) -> Result<Task> {
        immediate(conn, |tx| {
            let task = fetch(tx, user, id)?;
            if task.project_id.is_none() {
                return Err(DomainError::invalid_state("only project tasks can be linked to an action list"));
            }
            let list = match list_id {
                Some(l) => ListRepository::get(tx, user, l)?.filter(|l| l.kind == ListKind::Action),
                None => ListRepository::first_action_list(tx, user)?,
            }
            .ok_or_else(|| DomainError::not_found("action list"))?;
            TaskRepository::set_list(tx, id, Some(&list.id))?;
            info!(user_id = %user, task_id = %id, list_id = %list.id, "task linked to action list");
            fetch(tx, user, id)
        })
    }
}

fn fetch(conn: &Connection, user: &str, id: &str) -> Result<Task> {
    TaskRepository::get(conn, user, id)?.ok_or_else(|| DomainError::not_found("task"))
}

fn owned_list(conn: &Connection, user: &str, id: &str) -> Result<TaskList> {
    ListRepository::get(conn, user, id)?.ok_or_else(|| DomainError::not_found("list"))
}

fn require_project(conn: &Connection, user: &str, id: &str) -> Result<()> {
    if ProjectRepository::owns(conn, user, id)? {
        Ok(())
    } else {
        Err(DomainError::not_found("project"))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(unused_results)]
mod tests {
    use super::*;
    use crate::testing::{seed_list, seed_project, setup_db};
    use assert_matches::assert_matches;

    fn alice() -> UserId {
        UserId::from("alice")
    }

    fn in_project(conn: &Connection, project: &str, text: &str, at: Option<i64>) -> Task {
        TaskService::store(
            conn,
            &alice(),
            &TaskParams {
                project_id: Some(project.into()),
                description: text.into(),
                order_index: at,
                ..TaskParams::default()
            },
        )
        .unwrap()
    }

    fn in_list(conn: &Connection, list: &str, text: &str) -> Task {
        TaskService::store(
            conn,
            &alice(),
            &TaskParams {
                list_id: Some(list.into()),
                description: text.into(),
                deadline: Some("2026-05-01".into()),
                ..TaskParams::default()
            },
        )
        .unwrap()
    }

    fn project_order(conn: &Connection, project: &str) -> Vec<(String, Option<i64>)> {
        TaskService::for_project(conn, &alice(), project, &TaskFilter::default())
            .unwrap()
            .into_iter()
            .map(|v| (v.task.description, v.task.order_index))
            .collect()
    }

    fn assert_exclusive(conn: &Connection) {
        let bad: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM tasks WHERE (list_id IS NULL AND project_id IS NULL)",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(bad, 0);
    }

    #[test]
    fn store_appends_and_inserts_in_project() {
        let conn = setup_db();
        let p = seed_project(&conn, "alice");
        in_project(&conn, &p, "a", None);
        in_project(&conn, &p, "b", None);
        in_project(&conn, &p, "first", Some(0));
        assert_eq!(
            project_order(&conn, &p),
            vec![
                ("first".to_string(), Some(0)),
                ("a".to_string(), Some(1)),
                ("b".to_string(), Some(2)),
            ]
        );
    }

    #[test]
    fn restoring_the_same_task_keeps_its_slot() {
        let conn = setup_db();
        let p = seed_project(&conn, "alice");
        let params = TaskParams {
            id: Some("task-a".into()),
            project_id: Some(p.clone()),
            description: "a".into(),
            ..TaskParams::default()
        };
        TaskService::store(&conn, &alice(), &params).unwrap();
        in_project(&conn, &p, "b", None);

        let again = TaskService::store(&conn, &alice(), &params).unwrap();
        assert_eq!(again.order_index, Some(0));
        assert_eq!(
            project_order(&conn, &p),
            vec![("a".to_string(), Some(0)), ("b".to_string(), Some(1))]
        );

        let moved = TaskService::store(
            &conn,
            &alice(),
            &TaskParams {
                order_index: Some(1),
                ..params
            },
        )
        .unwrap();
        assert_eq!(moved.order_index, Some(1));
        assert_eq!(
            project_order(&conn, &p),
            vec![("b".to_string(), Some(0)), ("a".to_string(), Some(1))]
        );
    }

    #[test]
    fn restoring_into_another_project_appends_there() {
        let conn = setup_db();
        let p = seed_project(&conn, "alice");
        let q = seed_project(&conn, "alice");
        in_project(&conn, &q, "resident", None);
        let mut params = TaskParams {
            id: Some("task-a".into()),
            project_id: Some(p.clone()),
            description: "a".into(),
            ..TaskParams::default()
        };
        TaskService::store(&conn, &alice(), &params).unwrap();

        params.project_id = Some(q.clone());
        let moved = TaskService::store(&conn, &alice(), &params).unwrap();
        assert_eq!(moved.order_index, Some(1));
        assert!(project_order(&conn, &p).is_empty());
    }

    #[test]
    fn project_listing_filters_by_completion() {
        let conn = setup_db();
        let p = seed_project(&conn, "alice");
        let done = in_project(&conn, &p, "done", None);
        in_project(&conn, &p, "open", None);
        TaskService::toggle(&conn, &alice(), &done.id).unwrap();

        let filter = TaskFilter {
            completed: Some(false),
            ..TaskFilter::default()
        };
        let open: Vec<String> = TaskService::for_project(&conn, &alice(), &p, &filter)
            .unwrap()
            .into_iter()
            .map(|v| v.task.description)
            .collect();
        assert_eq!(open, vec!["open".to_string()]);
    }

    #[test]
    fn store_requires_exactly_one_container() {
        let conn = setup_db();
        let p = seed_project(&conn, "alice");
        let l = seed_list(&conn, "alice", "action");

        let none = TaskService::store(
            &conn,
            &alice(),
            &TaskParams {
                description: "floating".into(),
                ..TaskParams::default()
            },
        );
        assert_matches!(none, Err(DomainError::Validation(_)));

        let both = TaskService::store(
            &conn,
            &alice(),
            &TaskParams {
                list_id: Some(l.clone()),
                project_id: Some(p),
                description: "both".into(),
                ..TaskParams::default()
            },
        );
        assert_matches!(both, Err(DomainError::Validation(_)));

        let index_in_list = TaskService::store(
            &conn,
            &alice(),
            &TaskParams {
                list_id: Some(l),
                description: "indexed".into(),
                order_index: Some(0),
                ..TaskParams::default()
            },
        );
        assert_matches!(index_in_list, Err(DomainError::InvalidStateTransition(_)));
    }

    #[test]
    fn entry_list_strips_schedule() {
        let conn = setup_db();
        let entry = seed_list(&conn, "alice", "entry");
        let action = seed_list(&conn, "alice", "action");
        assert_eq!(in_list(&conn, &entry, "idea").deadline, None);
        assert_eq!(in_list(&conn, &action, "call").deadline.as_deref(), Some("2026-05-01"));
    }

    #[test]
    fn upsert_replaces_own_task_and_hides_others() {
        let conn = setup_db();
        let p = seed_project(&conn, "alice");
        let t = in_project(&conn, &p, "draft", None);
        let replaced = TaskService::store(
            &conn,
            &alice(),
            &TaskParams {
                id: Some(t.id.clone()),
                project_id: Some(p.clone()),
                description: "final".into(),
                ..TaskParams::default()
            },
        )
        .unwrap();
        assert_eq!(replaced.id, t.id);
        assert_eq!(replaced.order_index, Some(0));
        assert_eq!(project_order(&conn, &p).len(), 1);

        let bob_project = seed_project(&conn, "bob");
        let stolen = TaskService::store(
            &conn,
            &UserId::from("bob"),
            &TaskParams {
                id: Some(t.id),
                project_id: Some(bob_project),
                description: "mine".into(),
                ..TaskParams::default()
            },
        );
        assert_matches!(stolen, Err(DomainError::NotFound { .. }));
    }

    #[test]
    fn move_within_project_reorders() {
        let conn = setup_db();
        let p = seed_project(&conn, "alice");
        let a = in_project(&conn, &p, "a", None);
        in_project(&conn, &p, "b", None);
        let c = in_project(&conn, &p, "c", None);

        TaskService::move_to_project(&conn, &alice(), &c.id, &p, Some(0)).unwrap();
        TaskService::move_to_project(&conn, &alice(), &a.id, &p, Some(2)).unwrap();
        let order: Vec<String> = project_order(&conn, &p).into_iter().map(|(d, _)| d).collect();
        assert_eq!(order, vec!["c", "b", "a"]);
    }

    #[test]
    fn project_and_list_moves_are_disjoint() {
        let conn = setup_db();
        let p = seed_project(&conn, "alice");
        let l = seed_list(&conn, "alice", "action");
        let pt = in_project(&conn, &p, "project task", None);
        let lt = in_list(&conn, &l, "list task");

        assert_matches!(
            TaskService::move_to_list(&conn, &alice(), &pt.id, &l),
            Err(DomainError::InvalidStateTransition(_))
        );
        assert_matches!(
            TaskService::move_to_project(&conn, &alice(), &lt.id, &p, None),
            Err(DomainError::InvalidStateTransition(_))
        );

        let err = TaskService::move_many_to_list(&conn, &alice(), &[lt.id.clone(), pt.id.clone()], &l).unwrap_err();
        assert_matches!(err, DomainError::Blocked { ref ids, .. } if ids == &vec![pt.id.clone()]);

        let err = TaskService::move_many_to_project(&conn, &alice(), &[pt.id, lt.id.clone()], &p, None).unwrap_err();
        assert_matches!(err, DomainError::Blocked { ref ids, .. } if ids == &vec![lt.id.clone()]);
        assert_exclusive(&conn);
    }

    #[test]
    fn move_many_to_list_reports_destination() {
        let conn = setup_db();
        let from = seed_list(&conn, "alice", "action");
        let to = seed_list(&conn, "alice", "entry");
        let t1 = in_list(&conn, &from, "one");
        let t2 = in_list(&conn, &from, "two");

        let moved = TaskService::move_many_to_list(&conn, &alice(), &[t1.id.clone(), t2.id], &to).unwrap();
        assert_eq!(moved.moved_count, 2);
        assert_eq!(moved.list.id, to);
        let t1 = TaskService::get(&conn, &alice(), &t1.id).unwrap();
        assert_eq!(t1.task.list_id.as_deref(), Some(to.as_str()));
        assert_eq!(t1.task.deadline, None);
    }

    #[test]
    fn bulk_move_to_project_keeps_caller_order() {
        let conn = setup_db();
        let src = seed_project(&conn, "alice");
        let dst = seed_project(&conn, "alice");
        let x = in_project(&conn, &src, "x", None);
        let y = in_project(&conn, &src, "y", None);
        in_project(&conn, &dst, "d0", None);
        in_project(&conn, &dst, "d1", None);

        let moved = TaskService::move_many_to_project(&conn, &alice(), &[y.id, x.id], &dst, Some(1)).unwrap();
        assert_eq!(moved.len(), 2);
        let order: Vec<String> = project_order(&conn, &dst).into_iter().map(|(d, _)| d).collect();
        assert_eq!(order, vec!["d0", "y", "x", "d1"]);
        assert!(project_order(&conn, &src).is_empty());
    }

    #[test]
    fn move_to_other_project_appends_by_default() {
        let conn = setup_db();
        let src = seed_project(&conn, "alice");
        let dst = seed_project(&conn, "alice");
        let t = in_project(&conn, &src, "t", None);
        in_project(&conn, &dst, "d0", None);

        let moved = TaskService::move_to_project(&conn, &alice(), &t.id, &dst, None).unwrap();
        assert_eq!(moved.project_id.as_deref(), Some(dst.as_str()));
        assert_eq!(moved.order_index, Some(1));
    }

    #[test]
    fn link_to_action_list_dual_attaches() {
        let conn = setup_db();
        let p = seed_project(&conn, "alice");
        let entry = seed_list(&conn, "alice", "entry");
        let action = seed_list(&conn, "alice", "action");
        let t = in_project(&conn, &p, "t", None);

        assert_matches!(
            TaskService::link_to_action_list(&conn, &alice(), &t.id, Some(&entry)),
            Err(DomainError::NotFound { entity: "action list" })
        );
        let linked = TaskService::link_to_action_list(&conn, &alice(), &t.id, None).unwrap();
        assert_eq!(linked.list_id.as_deref(), Some(action.as_str()));
        assert_eq!(linked.project_id.as_deref(), Some(p.as_str()));
        assert!(linked.is_dual_attached());

        let list_view = TaskService::list_only(&conn, &alice()).unwrap();
        assert_eq!(list_view[0].project_title.as_deref(), Some("Project"));
        let project_view = TaskService::project_only(&conn, &alice()).unwrap();
        assert_eq!(project_view[0].list_designation.as_deref(), Some("Inbox"));
    }

    #[test]
    fn link_requires_project_task() {
        let conn = setup_db();
        let l = seed_list(&conn, "alice", "action");
        let t = in_list(&conn, &l, "t");
        assert_matches!(
            TaskService::link_to_action_list(&conn, &alice(), &t.id, Some(&l)),
            Err(DomainError::InvalidStateTransition(_))
        );
    }

    #[test]
    fn update_respects_attachment_rules() {
        let conn = setup_db();
        let p = seed_project(&conn, "alice");
        let l = seed_list(&conn, "alice", "action");
        let t = in_project(&conn, &p, "t", None);

        let detach_all = TaskPatch {
            project_id: Some(None),
            ..TaskPatch::default()
        };
        assert_matches!(
            TaskService::update(&conn, &alice(), &t.id, &detach_all),
            Err(DomainError::Validation(_))
        );

        let add_list = TaskPatch {
            list_id: Some(Some(l.clone())),
            ..TaskPatch::default()
        };
        assert_matches!(
            TaskService::update(&conn, &alice(), &t.id, &add_list),
            Err(DomainError::Validation(_))
        );

        let null_index = TaskPatch {
            order_index: Some(None),
            ..TaskPatch::default()
        };
        assert_matches!(
            TaskService::update(&conn, &alice(), &t.id, &null_index),
            Err(DomainError::Validation(_))
        );

        let to_list = TaskPatch {
            list_id: Some(Some(l.clone())),
            project_id: Some(None),
            ..TaskPatch::default()
        };
        let moved = TaskService::update(&conn, &alice(), &t.id, &to_list).unwrap();
        assert_eq!(moved.list_id.as_deref(), Some(l.as_str()));
        assert_eq!(moved.project_id, None);
        assert_eq!(moved.order_index, None);

        let index_without_project = TaskPatch {
            order_index: Some(Some(0)),
            ..TaskPatch::default()
        };
        assert_matches!(
            TaskService::update(&conn, &alice(), &t.id, &index_without_project),
            Err(DomainError::InvalidStateTransition(_))
        );
        assert_exclusive(&conn);
    }

    #[test]
    fn update_reorders_and_clears_fields() {
        let conn = setup_db();
        let p = seed_project(&conn, "alice");
        in_project(&conn, &p, "a", None);
        let b = in_project(&conn, &p, "b", None);

        let patch: TaskPatch =
            serde_json::from_str(r#"{"order_index": 0, "deadline": null, "description": "b!"}"#).unwrap();
        let updated = TaskService::update(&conn, &alice(), &b.id, &patch).unwrap();
        assert_eq!(updated.order_index, Some(0));
        assert_eq!(updated.description, "b!");
        let order: Vec<String> = project_order(&conn, &p).into_iter().map(|(d, _)| d).collect();
        assert_eq!(order, vec!["b!", "a"]);
    }

    #[test]
    fn toggle_flips_and_delete_counts() {
        let conn = setup_db();
        let l = seed_list(&conn, "alice", "action");
        let t1 = in_list(&conn, &l, "one");
        let t2 = in_list(&conn, &l, "two");

        assert!(TaskService::toggle(&conn, &alice(), &t1.id).unwrap().completed);
        assert!(!TaskService::toggle(&conn, &alice(), &t1.id).unwrap().completed);

        assert_matches!(
            TaskService::destroy_many(&conn, &UserId::from("bob"), &[t1.id.clone()]),
            Err(DomainError::NotFound { .. })
        );
        assert_eq!(TaskService::destroy_many(&conn, &alice(), &[t1.id, t2.id]).unwrap(), 2);
    }

    #[test]
    fn listing_filters_by_list_type_and_completion() {
        let conn = setup_db();
        let entry = seed_list(&conn, "alice", "entry");
        let action = seed_list(&conn, "alice", "action");
        let done = in_list(&conn, &entry, "done");
        in_list(&conn, &action, "open");
        TaskService::toggle(&conn, &alice(), &done.id).unwrap();

        let filter = TaskFilter {
            list_type: Some(ListKind::Action),
            ..TaskFilter::default()
        };
        let actions = TaskService::list(&conn, &alice(), &filter).unwrap();
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].list_type, Some(ListKind::Action));

        let filter = TaskFilter {
            completed: Some(true),
            ..TaskFilter::default()
        };
        let completed = TaskService::list(&conn, &alice(), &filter).unwrap();
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].task.id, done.id);
    }
}
