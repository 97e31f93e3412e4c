use rusqlite::{Connection, OptionalExtension, params};

use waypoint_core::{Result, generate_id, now_iso};

use crate::progress::RankInput;
use crate::types::{ChallengeTotals, Participant, ParticipantProgress, ParticipantRole, ParticipantTask, UserChallengeTask};

/// Challenge participations and their checklists.
pub struct ParticipantRepository;

impl ParticipantRepository {
    /// A user's participation in a challenge.
    pub fn get(conn: &Connection, challenge_id: &str, user_id: &str) -> Result<Option<Participant>> {
        Ok(conn
            .query_row(
                "SELECT * FROM challenge_participants WHERE challenge_id = ?1 AND user_id = ?2",
                params![challenge_id, user_id],
                |row| Ok(participant_from_row(row)),
            )
            .optional()?)
    }

    /// Insert a participation and return its ID.
    pub fn insert(conn: &Connection, challenge_id: &str, user_id: &str, role: ParticipantRole) -> Result<String> {
        let id = generate_id("participant");
        let now = now_iso();
        let _ = conn.execute(
            "INSERT INTO challenge_participants (id, challenge_id, user_id, role, joined_at, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5, ?5)",
            params![id, challenge_id, user_id, role.as_sql(), now],
        )?;
        Ok(id)
    }

    /// Delete a participation; its checklist goes with it.
    pub fn delete(conn: &Connection, id: &str) -> Result<bool> {
        Ok(conn.execute("DELETE FROM challenge_participants WHERE id = ?1", params![id])? > 0)
    }

    /// Give one participant an unchecked row for every task of the challenge.
    /// Returns how many rows were created.
    pub fn fan_out_to_participant(conn: &Connection, participant_id: &str, challenge_id: &str) -> Result<usize> {
        let task_ids: Vec<String> = {
            let mut stmt = conn.prepare("SELECT id FROM challenge_tasks WHERE challenge_id = ?1")?;
            let rows = stmt.query_map(params![challenge_id], |row| row.get(0))?;
            rows.collect::<std::result::Result<_, _>>()?
        };
        let mut created = 0;
        for task_id in &task_ids {
            created += insert_row(conn, participant_id, task_id)?;
        }
        Ok(created)
    }

    /// Give every current participant an unchecked row for one task.
    /// Returns how many rows were created.
    pub fn fan_out_task(conn: &Connection, task_id: &str, challenge_id: &str) -> Result<usize> {
        let participant_ids: Vec<String> = {
            let mut stmt = conn.prepare("SELECT id FROM challenge_participants WHERE challenge_id = ?1")?;
            let rows = stmt.query_map(params![challenge_id], |row| row.get(0))?;
            rows.collect::<std::result::Result<_, _>>()?
        };
        let mut created = 0;
        for participant_id in &participant_ids {
            created += insert_row(conn, participant_id, task_id)?;
        }
        Ok(created)
    }

    /// A participant's checklist in task creation order.
    pub fn tasks(conn: &Connection, participant_id: &str) -> Result<Vec<ParticipantTask>> {
        let mut stmt = conn.prepare(
            "SELECT pt.* FROM challenge_participant_tasks pt
             JOIN challenge_tasks t ON t.id = pt.task_id
             WHERE pt.participant_id = ?1
             ORDER BY t.created_at ASC, t.id ASC",
        )?;
        let rows = stmt.query_map(params![participant_id], |row| Ok(checklist_from_row(row)))?;
        Ok(rows.collect::<std::result::Result<_, _>>()?)
    }

    /// One checklist row.
    pub fn task(conn: &Connection, participant_id: &str, task_id: &str) -> Result<Option<ParticipantTask>> {
        Ok(conn
            .query_row(
                "SELECT * FROM challenge_participant_tasks WHERE participant_id = ?1 AND task_id = ?2",
                params![participant_id, task_id],
                |row| Ok(checklist_from_row(row)),
            )
            .optional()?)
    }

    /// Set a checklist row's completion. `completed_at` is kept only while
    /// the row is checked.
    pub fn set_completed(conn: &Connection, id: &str, completed: bool, at: &str) -> Result<()> {
        let completed_at = completed.then_some(at);
        let _ = conn.execute(
            "UPDATE challenge_participant_tasks
             SET completed = ?1, completed_at = ?2, updated_at = ?3
             WHERE id = ?4",
            params![completed, completed_at, now_iso(), id],
        )?;
        Ok(())
    }
}

fn insert_row(conn: &Connection, participant_id: &str, task_id: &str) -> Result<usize> {
    let now = now_iso();
    Ok(conn.execute(
        "INSERT INTO challenge_participant_tasks
            (id, participant_id, task_id, completed, completed_at, created_at, updated_at)
         VALUES (?1, ?2, ?3, 0, NULL, ?4, ?4)
         ON CONFLICT(participant_id, task_id) DO NOTHING",
        params![generate_id("ptask"), participant_id, task_id, now],
    )?)
}

// ─────────────────────────────────────────────────────────────────────────────
// Aggregates
// ─────────────────────────────────────────────────────────────────────────────

/// Read-only aggregate queries behind progress and ranking.
pub struct ProgressRepository;

impl ProgressRepository {
    /// Completed row count of every participant of a challenge. `progress`
    /// is left at zero for the caller to fill in.
    pub fn participant_counts(conn: &Connection, challenge_id: &str, total_tasks: i64) -> Result<Vec<ParticipantProgress>> {
        let mut stmt = conn.prepare(
            "SELECT p.id, p.user_id,
                (SELECT COUNT(*) FROM challenge_participant_tasks pt
                 WHERE pt.participant_id = p.id AND pt.completed = 1) AS completed_tasks
             FROM challenge_participants p
             WHERE p.challenge_id = ?1
             ORDER BY p.joined_at ASC, p.id ASC",
        )?;
        let rows = stmt.query_map(params![challenge_id], |row| {
            Ok(ParticipantProgress {
                participant_id: row.get_unwrap("id"),
                user_id: row.get_unwrap("user_id"),
                completed_tasks: row.get_unwrap("completed_tasks"),
                total_tasks,
                progress: 0.0,
            })
        })?;
        Ok(rows.collect::<std::result::Result<_, _>>()?)
    }

    /// Task, participant, and completed-row counts per challenge of a
    /// community, by start date. `progress` is left at zero.
    pub fn challenge_totals(conn: &Connection, community_id: &str) -> Result<Vec<ChallengeTotals>> {
        let mut stmt = conn.prepare(
            "SELECT c.id, c.title,
                (SELECT COUNT(*) FROM challenge_tasks t WHERE t.challenge_id = c.id) AS task_count,
                (SELECT COUNT(*) FROM challenge_participants p WHERE p.challenge_id = c.id) AS participant_count,
                (SELECT COUNT(*) FROM challenge_participant_tasks pt
                 JOIN challenge_participants p ON p.id = pt.participant_id
                 WHERE p.challenge_id = c.id AND pt.completed = 1) AS completed_tasks
             FROM challenges c
             WHERE c.community_id = ?1
             ORDER BY c.start_at ASC, c.id ASC",
        )?;
        let rows = stmt.query_map(params![community_id], |row| {
            Ok(ChallengeTotals {
                challenge_id: row.get_unwrap("id"),
                challenge_title: row.get_unwrap("title"),
                task_count: row.get_unwrap("task_count"),
                participant_count: row.get_unwrap("participant_count"),
                completed_tasks: row.get_unwrap("completed_tasks"),
                progress: 0.0,
            })
        })?;
        Ok(rows.collect::<std::result::Result<_, _>>()?)
    }

    /// Completed rows and latest completion per user across every challenge
    /// of a community.
    pub fn ranking_inputs(conn: &Connection, community_id: &str) -> Result<Vec<RankInput>> {
        let mut stmt = conn.prepare(
            "SELECT p.user_id,
                COUNT(pt.id) AS completed_tasks,
                MAX(pt.completed_at) AS last_completed_at
             FROM challenge_participants p
             JOIN challenges c ON c.id = p.challenge_id
             LEFT JOIN challenge_participant_tasks pt ON pt.participant_id = p.id AND pt.completed = 1
             WHERE c.community_id = ?1
             GROUP BY p.user_id",
        )?;
        let rows = stmt.query_map(params![community_id], |row| {
            Ok(RankInput {
                user_id: row.get_unwrap("user_id"),
                completed_tasks: row.get_unwrap("completed_tasks"),
                last_completed_at: row.get_unwrap("last_completed_at"),
            })
        })?;
        Ok(rows.collect::<std::result::Result<_, _>>()?)
    }

    /// Every checklist row of a user with its challenge and community.
    pub fn user_tasks(conn: &Connection, user_id: &str) -> Result<Vec<UserChallengeTask>> {
        let mut stmt = conn.prepare(
            "SELECT t.id AS task_id, t.description, pt.completed, pt.completed_at,
                    c.id AS challenge_id, c.title AS challenge_title,
                    cm.id AS community_id, cm.designation AS community_designation
             FROM challenge_participant_tasks pt
             JOIN challenge_participants p ON p.id = pt.participant_id
             JOIN challenge_tasks t ON t.id = pt.task_id
             JOIN challenges c ON c.id = p.challenge_id
             JOIN communities cm ON cm.id = c.community_id
             WHERE p.user_id = ?1
             ORDER BY c.start_at ASC, c.id ASC, t.created_at ASC, t.id ASC",
        )?;
        let rows = stmt.query_map(params![user_id], |row| {
            Ok(UserChallengeTask {
                task_id: row.get_unwrap("task_id"),
                description: row.get_unwrap("description"),
                completed: row.get_unwrap("completed"),
                completed_at: row.get_unwrap("completed_at"),
                challenge_id: row.get_unwrap("challenge_id"),
                challenge_title: row.get_unwrap("challenge_title"),
                community_id: row.get_unwrap("community_id"),
                community_designation: row.get_unwrap("community_designation"),
            })
        })?;
        Ok(rows.collect::<std::result::Result<_, _>>()?)
    }
}

fn participant_from_row(row: &rusqlite::Row<'_>) -> Participant {
    let role: String = row.get_unwrap("role");
    Participant {
        id: row.get_unwrap("id"),
        challenge_id: row.get_unwrap("challenge_id"),
        user_id: row.get_unwrap("user_id"),
        role: ParticipantRole::from_sql(&role),
        joined_at: row.get_unwrap("joined_at"),
    }
}

fn checklist_from_row(row: &rusqlite::Row<'_>) -> ParticipantTask {
    ParticipantTask {
        id: row.get_unwrap("id"),
        participant_id: row.get_unwrap("participant_id"),
        task_id: row.get_unwrap("task_id"),
        completed: row.get_unwrap("completed"),
        completed_at: row.get_unwrap("completed_at"),
        created_at: row.get_unwrap("created_at"),
        updated_at: row.get_unwrap("updated_at"),
    }
}
