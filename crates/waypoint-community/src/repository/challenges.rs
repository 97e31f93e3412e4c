use rusqlite::{Connection, OptionalExtension, params};

use waypoint_core::{Result, generate_id, now_iso};
use waypoint_store::Changes;

use crate::types::{Challenge, ChallengePatch, ChallengeTask, Status};

/// Challenges of a community.
pub struct ChallengeRepository;

impl ChallengeRepository {
    /// A community's challenges by start date, each with its participant count.
    pub fn list(conn: &Connection, community_id: &str) -> Result<Vec<(Challenge, i64)>> {
        let mut stmt = conn.prepare(
            "SELECT c.*,
                (SELECT COUNT(*) FROM challenge_participants p WHERE p.challenge_id = c.id) AS participant_count
             FROM challenges c
             WHERE c.community_id = ?1
             ORDER BY c.start_at ASC, c.id ASC",
        )?;
        let rows = stmt.query_map(params![community_id], |row| {
            Ok((challenge_from_row(row), row.get_unwrap("participant_count")))
        })?;
        Ok(rows.collect::<std::result::Result<_, _>>()?)
    }

    /// A challenge within a community.
    pub fn get(conn: &Connection, community_id: &str, id: &str) -> Result<Option<Challenge>> {
        Ok(conn
            .query_row(
                "SELECT * FROM challenges WHERE id = ?1 AND community_id = ?2",
                params![id, community_id],
                |row| Ok(challenge_from_row(row)),
            )
            .optional()?)
    }

    /// Number of participants.
    pub fn participant_count(conn: &Connection, id: &str) -> Result<i64> {
        Ok(conn.query_row(
            "SELECT COUNT(*) FROM challenge_participants WHERE challenge_id = ?1",
            params![id],
            |row| row.get(0),
        )?)
    }

    /// ID of the community's active challenge other than `except`, if any.
    pub fn active_other_than(conn: &Connection, community_id: &str, except: Option<&str>) -> Result<Option<String>> {
        Ok(conn
            .query_row(
                "SELECT id FROM challenges
                 WHERE community_id = ?1 AND status = 'active' AND (?2 IS NULL OR id <> ?2)
                 LIMIT 1",
                params![community_id, except],
                |row| row.get(0),
            )
            .optional()?)
    }

    /// Insert an active challenge.
    #[allow(clippy::too_many_arguments)]
    pub fn insert(
        conn: &Connection,
        id: &str,
        community_id: &str,
        created_by: &str,
        title: &str,
        description: Option<&str>,
        start_at: &str,
        end_at: Option<&str>,
    ) -> Result<()> {
        let now = now_iso();
        let _ = conn.execute(
            "INSERT INTO challenges
                (id, community_id, created_by, title, description, start_at, end_at, status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 'active', ?8, ?8)",
            params![id, community_id, created_by, title, description, start_at, end_at, now],
        )?;
        Ok(())
    }

    /// Partial update. Timestamps in `patch` must already be normalized.
    pub fn update(conn: &Connection, id: &str, patch: &ChallengePatch) -> Result<bool> {
        let mut changes = Changes::new();
        if let Some(ref title) = patch.title {
            changes.set("title", title.trim().to_string());
        }
        if let Some(ref description) = patch.description {
            changes.set("description", description.clone());
        }
        changes.set_some("start_at", patch.start_at.as_ref());
        if let Some(ref end_at) = patch.end_at {
            changes.set("end_at", end_at.clone());
        }
        if let Some(status) = patch.status {
            changes.set("status", status.as_sql());
        }
        Ok(changes.apply(conn, "challenges", id, None)?)
    }

    /// Move to `status`.
    pub fn set_status(conn: &Connection, id: &str, status: Status) -> Result<()> {
        let _ = conn.execute(
            "UPDATE challenges SET status = ?1, updated_at = ?2 WHERE id = ?3",
            params![status.as_sql(), now_iso(), id],
        )?;
        Ok(())
    }
}

/// Template tasks of a challenge.
pub struct ChallengeTaskRepository;

impl ChallengeTaskRepository {
    /// Tasks in creation order.
    pub fn list(conn: &Connection, challenge_id: &str) -> Result<Vec<ChallengeTask>> {
        let mut stmt = conn.prepare(
            "SELECT * FROM challenge_tasks WHERE challenge_id = ?1 ORDER BY created_at ASC, id ASC",
        )?;
        let rows = stmt.query_map(params![challenge_id], |row| Ok(task_from_row(row)))?;
        Ok(rows.collect::<std::result::Result<_, _>>()?)
    }

    /// A task within a challenge.
    pub fn get(conn: &Connection, challenge_id: &str, id: &str) -> Result<Option<ChallengeTask>> {
        Ok(conn
            .query_row(
                "SELECT * FROM challenge_tasks WHERE id = ?1 AND challenge_id = ?2",
                params![id, challenge_id],
                |row| Ok(task_from_row(row)),
            )
            .optional()?)
    }

    /// Number of tasks defined on a challenge.
    pub fn count(conn: &Connection, challenge_id: &str) -> Result<i64> {
        Ok(conn.query_row(
            "SELECT COUNT(*) FROM challenge_tasks WHERE challenge_id = ?1",
            params![challenge_id],
            |row| row.get(0),
        )?)
    }

    /// Insert a task and return its ID.
    pub fn insert(conn: &Connection, challenge_id: &str, description: &str) -> Result<String> {
        let id = generate_id("ctask");
        let now = now_iso();
        let _ = conn.execute(
            "INSERT INTO challenge_tasks (id, challenge_id, description, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)",
            params![id, challenge_id, description, now],
        )?;
        Ok(id)
    }

    /// Replace the task text.
    pub fn set_description(conn: &Connection, id: &str, description: &str) -> Result<()> {
        let _ = conn.execute(
            "UPDATE challenge_tasks SET description = ?1, updated_at = ?2 WHERE id = ?3",
            params![description, now_iso(), id],
        )?;
        Ok(())
    }

    /// Delete a task; its checklist rows go with it.
    pub fn delete(conn: &Connection, id: &str) -> Result<bool> {
        Ok(conn.execute("DELETE FROM challenge_tasks WHERE id = ?1", params![id])? > 0)
    }
}

fn challenge_from_row(row: &rusqlite::Row<'_>) -> Challenge {
    let status: String = row.get_unwrap("status");
    Challenge {
        id: row.get_unwrap("id"),
        community_id: row.get_unwrap("community_id"),
        created_by: row.get_unwrap("created_by"),
        title: row.get_unwrap("title"),
        description: row.get_unwrap("description"),
        start_at: row.get_unwrap("start_at"),
        end_at: row.get_unwrap("end_at"),
        status: Status::from_sql(&status),
        created_at: row.get_unwrap("created_at"),
        updated_at: row.get_unwrap("updated_at"),
    }
}

fn task_from_row(row: &rusqlite::Row<'_>) -> ChallengeTask {
    ChallengeTask {
        id: row.get_unwrap("id"),
        challenge_id: row.get_unwrap("challenge_id"),
        description: row.get_unwrap("description"),
        created_at: row.get_unwrap("created_at"),
        updated_at: row.get_unwrap("updated_at"),
    }
}
