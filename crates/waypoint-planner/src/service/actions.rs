//! Project actions and their mirrored tasks.
//!
//! An action can be mirrored into an action list as a standalone task. The
//! mirror follows the action: every change to the action's description or
//! done flag is copied onto each task whose `linked_action_id` points at it.
//! Edits made on the task never flow back.

use rusqlite::Connection;
use tracing::{debug, info};

use waypoint_core::{DomainError, Result, UserId, generate_id};
use waypoint_store::immediate;

use super::{dedup_ids, require_ids, require_text, upsert_id};
use crate::ordering::{self, Sequence};
use crate::repository::{ActionRepository, ListRepository, ProjectRepository, TaskRepository, TaskWrite};
use crate::types::{ActionMirror, ActionParams, ActionPatch, ListKind, ProjectAction};

const DESCRIPTION_MAX: usize = 255;

/// Ordered project actions.
pub struct ActionService;

impl ActionService {
    /// Actions of the user's projects, or of one of them.
    pub fn list(conn: &Connection, user: &UserId, project_id: Option<&str>) -> Result<Vec<ProjectAction>> {
        if let Some(p) = project_id {
            if !ProjectRepository::owns(conn, user, p)? {
                return Err(DomainError::not_found("project"));
            }
        }
        ActionRepository::list_owned(conn, user, project_id)
    }

    /// One action of the user's projects.
    pub fn get(conn: &Connection, user: &UserId, id: &str) -> Result<ProjectAction> {
        fetch(conn, user, id)
    }

    /// Create or replace an action; it goes to the end of its project or to
    /// `order_index`. A replaced action that stays in its project keeps its
    /// place when no `order_index` is given.
    pub fn store(conn: &Connection, user: &UserId, params: &ActionParams) -> Result<ProjectAction> {
        require_text("description", &params.description, DESCRIPTION_MAX)?;
        if params.order_index.is_some_and(|k| k < 0) {
            return Err(DomainError::validation("order_index must be zero or greater"));
        }
        immediate(conn, |tx| {
            if !ProjectRepository::owns(tx, user, &params.project_id)? {
                return Err(DomainError::not_found("project"));
            }
            let requested = params.id.as_deref().map(str::trim).filter(|s| !s.is_empty());
            let id = match requested {
                Some(id) if ActionRepository::get_owned(tx, user, id)?.is_some() => {
                    ActionRepository::replace(tx, id, &params.project_id, &params.description, params.is_done)?;
                    let _ = TaskRepository::propagate_from_action(tx, id, &params.description, params.is_done)?;
                    id.to_string()
                }
                Some(id) if ActionRepository::exists(tx, id)? => return Err(DomainError::not_found("project action")),
                requested => {
                    let id = requested.map_or_else(|| generate_id("action"), str::to_string);
                    ActionRepository::insert(tx, &id, &params.project_id, &params.description, params.is_done)?;
                    id
                }
            };

            let seq = Sequence::ProjectActions {
                project_id: &params.project_id,
            };
            let index = match (params.order_index, ordering::index_of(tx, seq, &id)?) {
                (Some(k), _) => ordering::place(tx, seq, &id, k)?,
                (None, Some(kept)) => kept,
                (None, None) => ordering::append(tx, seq, &id)?,
            };
            info!(user_id = %user, action_id = %id, project_id = %params.project_id, index, "project action stored");
            fetch(tx, user, &id)
        })
    }

    /// Partial update. Description and done flag are copied to mirrors.
    pub fn update(conn: &Connection, user: &UserId, id: &str, patch: &ActionPatch) -> Result<ProjectAction> {
        if let Some(ref d) = patch.description {
            require_text("description", d, DESCRIPTION_MAX)?;
        }
        if patch.order_index.is_some_and(|k| k < 0) {
            return Err(DomainError::validation("order_index must be zero or greater"));
        }
        immediate(conn, |tx| {
            let current = fetch(tx, user, id)?;
            if patch.description.is_some() || patch.is_done.is_some() {
                ActionRepository::set_fields(tx, id, patch.description.as_deref(), patch.is_done)?;
                let description = patch.description.as_deref().unwrap_or(&current.description);
                let is_done = patch.is_done.unwrap_or(current.is_done);
                let mirrors = TaskRepository::propagate_from_action(tx, id, description, is_done)?;
                debug!(action_id = %id, mirrors, "action fields propagated");
            }
            if let Some(k) = patch.order_index {
                let seq = Sequence::ProjectActions {
                    project_id: &current.project_id,
                };
                let _ = ordering::place(tx, seq, id, k)?;
            }
            fetch(tx, user, id)
        })
    }

    /// Flip the done flag and copy it to mirrors.
    pub fn toggle(conn: &Connection, user: &UserId, id: &str) -> Result<ProjectAction> {
        immediate(conn, |tx| {
            let current = fetch(tx, user, id)?;
            let is_done = !current.is_done;
            ActionRepository::set_fields(tx, id, None, Some(is_done))?;
            let _ = TaskRepository::propagate_from_action(tx, id, &current.description, is_done)?;
            fetch(tx, user, id)
        })
    }

    /// Move an action to `order_index` within its project.
    pub fn move_to(conn: &Connection, user: &UserId, id: &str, order_index: i64) -> Result<ProjectAction> {
        if order_index < 0 {
            return Err(DomainError::validation("order_index must be zero or greater"));
        }
        immediate(conn, |tx| {
            let current = fetch(tx, user, id)?;
            let seq = Sequence::ProjectActions {
                project_id: &current.project_id,
            };
            let index = ordering::place(tx, seq, id, order_index)?;
            debug!(action_id = %id, from = ?current.order_index, to = index, "project action moved");
            fetch(tx, user, id)
        })
    }

    /// Reposition several actions of one project as a consecutive block in
    /// the order given, starting at `start` or after the last action.
    pub fn move_many(conn: &Connection, user: &UserId, ids: &[String], start: Option<i64>) -> Result<Vec<ProjectAction>> {
        require_ids(ids)?;
        if start.is_some_and(|k| k < 0) {
            return Err(DomainError::validation("order_index must be zero or greater"));
        }
        let ids = dedup_ids(ids);
        immediate(conn, |tx| {
            let mut actions = Vec::with_capacity(ids.len());
            for id in &ids {
                actions.push(fetch(tx, user, id)?);
            }
            let project_id = actions[0].project_id.clone();
            if actions.iter().any(|a| a.project_id != project_id) {
                return Err(DomainError::validation("actions moved together must belong to one project"));
            }
            let seq = Sequence::ProjectActions { project_id: &project_id };
            let first = ordering::place_block(tx, seq, &ids, start)?;
            info!(user_id = %user, project_id = %project_id, moved = ids.len(), first, "project actions moved");
            ids.iter().map(|id| fetch(tx, user, id)).collect()
        })
    }

    /// Delete an action; its mirrors go with it.
    pub fn destroy(conn: &Connection, user: &UserId, id: &str) -> Result<()> {
        immediate(conn, |tx| {
            let _ = fetch(tx, user, id)?;
            let _ = ActionRepository::delete(tx, id)?;
            info!(user_id = %user, action_id = %id, "project action deleted");
            Ok(())
        })
    }

    /// Delete several actions; returns how many were deleted.
    pub fn destroy_many(conn: &Connection, user: &UserId, ids: &[String]) -> Result<usize> {
        require_ids(ids)?;
        let ids = dedup_ids(ids);
        immediate(conn, |tx| {
            let deleted = ActionRepository::delete_owned_many(tx, user, &ids)?;
            if deleted == 0 {
                return Err(DomainError::not_found("project action"));
            }
            Ok(deleted)
        })
    }

    /// Mirror an action into an action list.
    ///
    /// An existing mirror is moved to the list and refreshed; otherwise a
    /// new list task is created (with `task_id` if given). Without `list_id`
    /// the user's oldest action list is used.
    pub fn link_to_list(
        conn: &Connection,
        user: &UserId,
        id: &str,
        list_id: Option<&str>,
        task_id: Option<&str>,
    ) -> Result<ActionMirror> {
        immediate(conn, |tx| {
            let action = fetch(tx, user, id)?;
            let list = match list_id {
                Some(l) => ListRepository::get(tx, user, l)?.filter(|l| l.kind == ListKind::Action),
                None => ListRepository::first_action_list(tx, user)?,
            }
            .ok_or_else(|| DomainError::not_found("action list"))?;

            let task_id = match TaskRepository::mirror_of(tx, &action.id)? {
                Some(mirror) => {
                    TaskRepository::set_list(tx, &mirror.id, Some(&list.id))?;
                    let _ = TaskRepository::propagate_from_action(tx, &action.id, &action.description, action.is_done)?;
                    mirror.id
                }
                None => {
                    let task_id = upsert_id(tx, "tasks", user, task_id, "task", "task")?;
                    let write = TaskWrite {
                        list_id: Some(&list.id),
                        description: &action.description,
                        completed: action.is_done,
                        linked_action_id: Some(&action.id),
                        ..TaskWrite::default()
                    };
                    if TaskRepository::get(tx, user, &task_id)?.is_some() {
                        TaskRepository::overwrite(tx, &task_id, &write)?;
                    } else {
                        TaskRepository::insert(tx, user, &task_id, &write)?;
                    }
                    task_id
                }
            };
            info!(user_id = %user, action_id = %action.id, task_id = %task_id, list_id = %list.id, "action mirrored");
            let task = TaskRepository::get(tx, user, &task_id)?.ok_or_else(|| DomainError::not_found("task"))?;
            Ok(ActionMirror {
                project_action: action,
                task,
            })
        })
    }
}

fn fetch(conn: &Connection, user: &str, id: &str) -> Result<ProjectAction> {
    ActionRepository::get_owned(conn, user, id)?.ok_or_else(|| DomainError::not_found("project action"))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(unused_results)]
mod tests {
    use super::*;
    use crate::service::TaskService;
    use crate::testing::{seed_list, seed_project, setup_db};
    use crate::types::TaskPatch;
    use assert_matches::assert_matches;

    fn alice() -> UserId {
        UserId::from("alice")
    }

    fn action(conn: &Connection, project: &str, text: &str, at: Option<i64>) -> ProjectAction {
        ActionService::store(
            conn,
            &alice(),
            &ActionParams {
                project_id: project.into(),
                description: text.into(),
                order_index: at,
                ..ActionParams::default()
            },
        )
        .unwrap()
    }

    fn order(conn: &Connection, project: &str) -> Vec<(String, Option<i64>)> {
        ActionService::list(conn, &alice(), Some(project))
            .unwrap()
            .into_iter()
            .map(|a| (a.description, a.order_index))
            .collect()
    }

    #[test]
    fn restoring_the_same_action_keeps_its_slot() {
        let conn = setup_db();
        let q = seed_project(&conn, "alice");
        let params = ActionParams {
            id: Some("action-a".into()),
            project_id: q.clone(),
            description: "a".into(),
            ..ActionParams::default()
        };
        ActionService::store(&conn, &alice(), &params).unwrap();
        action(&conn, &q, "b", None);

        let again = ActionService::store(&conn, &alice(), &params).unwrap();
        assert_eq!(again.order_index, Some(0));
        assert_eq!(
            order(&conn, &q),
            vec![("a".to_string(), Some(0)), ("b".to_string(), Some(1))]
        );
    }

    #[test]
    fn failed_reorder_leaves_the_order_untouched() {
        let conn = setup_db();
        let q = seed_project(&conn, "alice");
        let a = action(&conn, &q, "a", None);
        action(&conn, &q, "b", None);
        action(&conn, &q, "c", None);
        // Neighbours shift first; writing the moved action's final index fails.
        conn.execute_batch(&format!(
            "CREATE TEMP TRIGGER final_index_fails
             BEFORE UPDATE OF order_index ON project_actions
             WHEN NEW.id = '{}' AND NEW.order_index = 2
             BEGIN SELECT RAISE(ABORT, 'write failed'); END;",
            a.id
        ))
        .unwrap();

        let err = ActionService::move_to(&conn, &alice(), &a.id, 2).unwrap_err();
        assert!(err.is_internal());
        assert_eq!(
            order(&conn, &q),
            vec![
                ("a".to_string(), Some(0)),
                ("b".to_string(), Some(1)),
                ("c".to_string(), Some(2)),
            ]
        );
    }

    #[test]
    fn append_then_move_to_front() {
        let conn = setup_db();
        let q = seed_project(&conn, "alice");
        let a1 = action(&conn, &q, "a1", None);
        assert_eq!(a1.order_index, Some(0));
        let a2 = action(&conn, &q, "a2", None);
        assert_eq!(a2.order_index, Some(1));

        ActionService::move_to(&conn, &alice(), &a2.id, 0).unwrap();
        assert_eq!(
            order(&conn, &q),
            vec![("a2".to_string(), Some(0)), ("a1".to_string(), Some(1))]
        );
    }

    #[test]
    fn project_listing_embeds_ordered_actions() {
        let conn = setup_db();
        let q = seed_project(&conn, "alice");
        action(&conn, &q, "second", None);
        action(&conn, &q, "first", Some(0));
        let project = crate::ProjectService::get(&conn, &alice(), &q).unwrap();
        let names: Vec<&str> = project.actions.iter().map(|a| a.description.as_str()).collect();
        assert_eq!(names, vec!["first", "second"]);
    }

    #[test]
    fn mirror_follows_action_one_way() {
        let conn = setup_db();
        let q = seed_project(&conn, "alice");
        let list = seed_list(&conn, "alice", "action");
        let a = action(&conn, &q, "Draft chapter", None);

        let mirror = ActionService::link_to_list(&conn, &alice(), &a.id, None, Some("task-mirror")).unwrap();
        assert_eq!(mirror.task.id, "task-mirror");
        assert_eq!(mirror.task.list_id.as_deref(), Some(list.as_str()));
        assert_eq!(mirror.task.project_id, None);
        assert_eq!(mirror.task.linked_action_id.as_deref(), Some(a.id.as_str()));

        let patch = ActionPatch {
            description: Some("Draft chapter 2".into()),
            is_done: Some(true),
            order_index: None,
        };
        ActionService::update(&conn, &alice(), &a.id, &patch).unwrap();
        let task = TaskService::get(&conn, &alice(), "task-mirror").unwrap().task;
        assert_eq!(task.description, "Draft chapter 2");
        assert!(task.completed);

        ActionService::toggle(&conn, &alice(), &a.id).unwrap();
        assert!(!TaskService::get(&conn, &alice(), "task-mirror").unwrap().task.completed);

        let edit = TaskPatch {
            description: Some("edited on the task".into()),
            ..TaskPatch::default()
        };
        TaskService::update(&conn, &alice(), "task-mirror", &edit).unwrap();
        assert_eq!(ActionService::get(&conn, &alice(), &a.id).unwrap().description, "Draft chapter 2");
    }

    #[test]
    fn relinking_reuses_the_mirror() {
        let conn = setup_db();
        let q = seed_project(&conn, "alice");
        let first = seed_list(&conn, "alice", "action");
        let a = action(&conn, &q, "step", None);
        let m1 = ActionService::link_to_list(&conn, &alice(), &a.id, Some(&first), None).unwrap();

        let second = seed_list(&conn, "alice", "action");
        let m2 = ActionService::link_to_list(&conn, &alice(), &a.id, Some(&second), None).unwrap();
        assert_eq!(m1.task.id, m2.task.id);
        assert_eq!(m2.task.list_id.as_deref(), Some(second.as_str()));

        let mirrors: i64 = conn
            .query_row("SELECT COUNT(*) FROM tasks WHERE linked_action_id = ?1", [&a.id], |r| r.get(0))
            .unwrap();
        assert_eq!(mirrors, 1);
    }

    #[test]
    fn link_needs_an_action_list() {
        let conn = setup_db();
        let q = seed_project(&conn, "alice");
        let entry = seed_list(&conn, "alice", "entry");
        let a = action(&conn, &q, "step", None);
        assert_matches!(
            ActionService::link_to_list(&conn, &alice(), &a.id, None, None),
            Err(DomainError::NotFound { entity: "action list" })
        );
        assert_matches!(
            ActionService::link_to_list(&conn, &alice(), &a.id, Some(&entry), None),
            Err(DomainError::NotFound { entity: "action list" })
        );
    }

    #[test]
    fn deleting_action_removes_mirror() {
        let conn = setup_db();
        let q = seed_project(&conn, "alice");
        seed_list(&conn, "alice", "action");
        let a = action(&conn, &q, "step", None);
        let m = ActionService::link_to_list(&conn, &alice(), &a.id, None, None).unwrap();
        ActionService::destroy(&conn, &alice(), &a.id).unwrap();
        assert_matches!(
            TaskService::get(&conn, &alice(), &m.task.id),
            Err(DomainError::NotFound { .. })
        );
    }

    #[test]
    fn bulk_move_uses_caller_order() {
        let conn = setup_db();
        let q = seed_project(&conn, "alice");
        let a = action(&conn, &q, "a", None);
        let b = action(&conn, &q, "b", None);
        let c = action(&conn, &q, "c", None);

        ActionService::move_many(&conn, &alice(), &[c.id, a.id], Some(0)).unwrap();
        let names: Vec<String> = order(&conn, &q).into_iter().map(|(d, _)| d).collect();
        assert_eq!(names, vec!["c", "a", "b"]);

        let other = seed_project(&conn, "alice");
        let x = action(&conn, &other, "x", None);
        assert_matches!(
            ActionService::move_many(&conn, &alice(), &[b.id, x.id], None),
            Err(DomainError::Validation(_))
        );
    }

    #[test]
    fn actions_are_scoped_through_projects() {
        let conn = setup_db();
        let q = seed_project(&conn, "alice");
        let a = action(&conn, &q, "mine", None);
        let bob = UserId::from("bob");
        assert_matches!(ActionService::get(&conn, &bob, &a.id), Err(DomainError::NotFound { .. }));
        assert_matches!(
            ActionService::destroy_many(&conn, &bob, &[a.id.clone()]),
            Err(DomainError::NotFound { .. })
        );
        assert_matches!(ActionService::list(&conn, &bob, Some(&q)), Err(DomainError::NotFound { .. }));
        assert_eq!(ActionService::destroy_many(&conn, &alice(), &[a.id]).unwrap(), 1);
    }
}
