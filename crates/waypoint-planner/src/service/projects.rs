use rusqlite::Connection;
use tracing::info;

use waypoint_core::{DomainError, Result, UserId};
use waypoint_store::immediate;

use super::{check_text, dedup_ids, require_ids, require_text, upsert_id};
use crate::repository::{HierarchyRepository, ProjectRepository};
use crate::types::{Project, ProjectParams, ProjectPatch};

const TITLE_MAX: usize = 255;
const TEXT_MAX: usize = 2000;

/// Projects under monthly goals.
pub struct ProjectService;

impl ProjectService {
    /// Active (non-archived) projects with their ordered actions.
    pub fn list(conn: &Connection, user: &UserId) -> Result<Vec<Project>> {
        ProjectRepository::list_projects(conn, user, false)
    }

    /// Archived projects.
    pub fn list_archived(conn: &Connection, user: &UserId) -> Result<Vec<Project>> {
        ProjectRepository::list_projects(conn, user, true)
    }

    /// One of the user's projects.
    pub fn get(conn: &Connection, user: &UserId, id: &str) -> Result<Project> {
        ProjectRepository::get_project(conn, user, id)?.ok_or_else(|| DomainError::not_found("project"))
    }

    /// Create or replace a project under one of the user's monthly goals.
    pub fn store(conn: &Connection, user: &UserId, params: &ProjectParams) -> Result<Project> {
        require_text("title", &params.title, TITLE_MAX)?;
        require_text("purpose", &params.purpose, TEXT_MAX)?;
        require_text("expected_result", &params.expected_result, TEXT_MAX)?;
        immediate(conn, |tx| {
            if HierarchyRepository::get_monthly_goal(tx, user, &params.monthly_goal_id)?.is_none() {
                return Err(DomainError::not_found("monthly goal"));
            }
            let id = upsert_id(tx, "projects", user, params.id.as_deref(), "project", "project")?;
            ProjectRepository::upsert_project(tx, user, &id, params)?;
            info!(user_id = %user, project_id = %id, "project stored");
            ProjectRepository::get_project(tx, user, &id)?.ok_or_else(|| DomainError::not_found("project"))
        })
    }

    /// Partial project update.
    pub fn update(conn: &Connection, user: &UserId, id: &str, patch: &ProjectPatch) -> Result<Project> {
        check_text("title", patch.title.as_ref(), TITLE_MAX)?;
        check_text("purpose", patch.purpose.as_ref(), TEXT_MAX)?;
        check_text("expected_result", patch.expected_result.as_ref(), TEXT_MAX)?;
        immediate(conn, |tx| {
            if !ProjectRepository::owns(tx, user, id)? {
                return Err(DomainError::not_found("project"));
            }
            if let Some(ref goal) = patch.monthly_goal_id {
                if HierarchyRepository::get_monthly_goal(tx, user, goal)?.is_none() {
                    return Err(DomainError::not_found("monthly goal"));
                }
            }
            let _ = ProjectRepository::update_project(tx, user, id, patch)?;
            ProjectRepository::get_project(tx, user, id)?.ok_or_else(|| DomainError::not_found("project"))
        })
    }

    /// Delete a project with its actions and tasks.
    pub fn delete(conn: &Connection, user: &UserId, id: &str) -> Result<()> {
        immediate(conn, |tx| {
            if !ProjectRepository::delete_project(tx, user, id)? {
                return Err(DomainError::not_found("project"));
            }
            info!(user_id = %user, project_id = %id, "project deleted");
            Ok(())
        })
    }

    /// Flip the archive flag.
    pub fn toggle_archive(conn: &Connection, user: &UserId, id: &str) -> Result<Project> {
        immediate(conn, |tx| {
            if ProjectRepository::toggle_archived(tx, user, &[id.to_string()])? == 0 {
                return Err(DomainError::not_found("project"));
            }
            let project = ProjectRepository::get_project(tx, user, id)?.ok_or_else(|| DomainError::not_found("project"))?;
            info!(user_id = %user, project_id = %id, archived = project.is_archived, "project archive toggled");
            Ok(project)
        })
    }

    /// Flip the archive flag on several projects; returns how many changed.
    pub fn toggle_archive_many(conn: &Connection, user: &UserId, ids: &[String]) -> Result<usize> {
        require_ids(ids)?;
        let ids = dedup_ids(ids);
        immediate(conn, |tx| {
            let changed = ProjectRepository::toggle_archived(tx, user, &ids)?;
            if changed == 0 {
                return Err(DomainError::not_found("project"));
            }
            Ok(changed)
        })
    }

    /// Delete several projects; returns how many were deleted.
    pub fn delete_many(conn: &Connection, user: &UserId, ids: &[String]) -> Result<usize> {
        require_ids(ids)?;
        let ids = dedup_ids(ids);
        immediate(conn, |tx| {
            let deleted = ProjectRepository::delete_projects(tx, user, &ids)?;
            if deleted == 0 {
                return Err(DomainError::not_found("project"));
            }
            info!(user_id = %user, deleted, "projects deleted");
            Ok(deleted)
        })
    }
}

#[cfg(test)]
#[allow(unused_results)]
mod tests {
    use super::*;
    use crate::testing::{seed_project, setup_db};
    use assert_matches::assert_matches;

    #[test]
    fn archive_toggles_and_hides_from_listing() {
        let conn = setup_db();
        let alice = UserId::from("alice");
        let p1 = seed_project(&conn, "alice");
        let p2 = seed_project(&conn, "alice");

        let archived = ProjectService::toggle_archive(&conn, &alice, &p1).unwrap();
        assert!(archived.is_archived);

        let active: Vec<String> = ProjectService::list(&conn, &alice).unwrap().into_iter().map(|p| p.id).collect();
        assert_eq!(active, vec![p2.clone()]);
        assert_eq!(ProjectService::list_archived(&conn, &alice).unwrap().len(), 1);

        let restored = ProjectService::toggle_archive(&conn, &alice, &p1).unwrap();
        assert!(!restored.is_archived);

        assert_eq!(ProjectService::toggle_archive_many(&conn, &alice, &[p1, p2]).unwrap(), 2);
        assert!(ProjectService::list(&conn, &alice).unwrap().is_empty());
    }

    #[test]
    fn projects_are_tenant_scoped() {
        let conn = setup_db();
        let p = seed_project(&conn, "alice");
        let bob = UserId::from("bob");
        assert_matches!(ProjectService::get(&conn, &bob, &p), Err(DomainError::NotFound { .. }));
        assert_matches!(ProjectService::delete(&conn, &bob, &p), Err(DomainError::NotFound { .. }));
        assert_matches!(
            ProjectService::delete_many(&conn, &bob, &[p.clone()]),
            Err(DomainError::NotFound { .. })
        );
        assert_matches!(
            ProjectService::store(
                &conn,
                &bob,
                &ProjectParams {
                    id: Some(p),
                    monthly_goal_id: "monthly-x".into(),
                    title: "t".into(),
                    purpose: "p".into(),
                    expected_result: "e".into(),
                }
            ),
            Err(DomainError::NotFound { .. })
        );
    }

    #[test]
    fn deleting_a_project_cascades_to_actions_and_tasks() {
        let conn = setup_db();
        let alice = UserId::from("alice");
        let p = seed_project(&conn, "alice");
        conn.execute(
            "INSERT INTO project_actions (id, project_id, description, order_index, created_at, updated_at)
             VALUES ('a1', ?1, 'step', 0, 'x', 'x')",
            [&p],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO tasks (id, user_id, project_id, description, order_index, created_at, updated_at)
             VALUES ('t1', 'alice', ?1, 'task', 0, 'x', 'x')",
            [&p],
        )
        .unwrap();

        ProjectService::delete(&conn, &alice, &p).unwrap();

        let remaining: i64 = conn
            .query_row(
                "SELECT (SELECT COUNT(*) FROM project_actions) + (SELECT COUNT(*) FROM tasks)",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(remaining, 0);
    }
}
