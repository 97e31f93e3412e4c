use rusqlite::Connection;
use tracing::info;

use waypoint_core::{DomainError, Result, UserId};
use waypoint_store::immediate;

use super::{check_text, dedup_ids, require_ids, require_text, upsert_id};
use crate::repository::{ListRepository, TaskRepository};
use crate::types::{ListKind, ListParams, ListPatch, TaskFilter, TaskList, TaskView};

const DESIGNATION_MAX: usize = 255;

/// Entry and action lists.
pub struct ListService;

impl ListService {
    /// The user's lists.
    pub fn list(conn: &Connection, user: &UserId) -> Result<Vec<TaskList>> {
        ListRepository::list(conn, user)
    }

    /// One of the user's lists.
    pub fn get(conn: &Connection, user: &UserId, id: &str) -> Result<TaskList> {
        ListRepository::get(conn, user, id)?.ok_or_else(|| DomainError::not_found("list"))
    }

    /// Tasks in one of the user's lists, newest first.
    pub fn tasks(conn: &Connection, user: &UserId, id: &str) -> Result<Vec<TaskView>> {
        if ListRepository::get(conn, user, id)?.is_none() {
            return Err(DomainError::not_found("list"));
        }
        let filter = TaskFilter {
            list_id: Some(id.to_string()),
            ..TaskFilter::default()
        };
        TaskRepository::list(conn, user, &filter)
    }

    /// Create or replace a list.
    pub fn store(conn: &Connection, user: &UserId, params: &ListParams) -> Result<TaskList> {
        require_text("designation", &params.designation, DESIGNATION_MAX)?;
        immediate(conn, |tx| {
            let id = upsert_id(tx, "lists", user, params.id.as_deref(), "list", "list")?;
            ListRepository::upsert(tx, user, &id, params)?;
            if params.kind == ListKind::Entry {
                clear_schedules(tx, user, &id)?;
            }
            info!(user_id = %user, list_id = %id, kind = params.kind.as_sql(), "list stored");
            ListRepository::get(tx, user, &id)?.ok_or_else(|| DomainError::not_found("list"))
        })
    }

    /// Rename or change the kind of a list. Turning a list into an entry list
    /// strips scheduling fields from its tasks.
    pub fn update(conn: &Connection, user: &UserId, id: &str, patch: &ListPatch) -> Result<TaskList> {
        check_text("designation", patch.designation.as_ref(), DESIGNATION_MAX)?;
        immediate(conn, |tx| {
            if !ListRepository::update(tx, user, id, patch)? && ListRepository::get(tx, user, id)?.is_none() {
                return Err(DomainError::not_found("list"));
            }
            if patch.kind == Some(ListKind::Entry) {
                clear_schedules(tx, user, id)?;
            }
            ListRepository::get(tx, user, id)?.ok_or_else(|| DomainError::not_found("list"))
        })
    }

    /// Delete a list and the tasks that live only in it.
    pub fn delete(conn: &Connection, user: &UserId, id: &str) -> Result<()> {
        immediate(conn, |tx| {
            if ListRepository::delete_many(tx, user, &[id.to_string()])? == 0 {
                return Err(DomainError::not_found("list"));
            }
            info!(user_id = %user, list_id = %id, "list deleted");
            Ok(())
        })
    }

    /// Delete several lists; returns how many were deleted.
    pub fn delete_many(conn: &Connection, user: &UserId, ids: &[String]) -> Result<usize> {
        require_ids(ids)?;
        let ids = dedup_ids(ids);
        immediate(conn, |tx| {
            let deleted = ListRepository::delete_many(tx, user, &ids)?;
            if deleted == 0 {
                return Err(DomainError::not_found("list"));
            }
            info!(user_id = %user, deleted, "lists deleted");
            Ok(deleted)
        })
    }
}

fn clear_schedules(conn: &Connection, user: &str, list_id: &str) -> Result<()> {
    let filter = TaskFilter {
        list_id: Some(list_id.to_string()),
        ..TaskFilter::default()
    };
    for view in TaskRepository::list(conn, user, &filter)? {
        TaskRepository::clear_schedule(conn, &view.task.id)?;
    }
    Ok(())
}
