//! Versioned schema.
//!
//! Each step is a SQL script compiled into the binary. Steps apply in
//! ascending version inside their own transaction and are recorded in
//! `schema_version`; a step whose version is already recorded is skipped.

use rusqlite::{Connection, params};
use tracing::{debug, info};

use crate::errors::{Result, StoreError};

struct Step {
    version: u32,
    summary: &'static str,
    script: &'static str,
}

const STEPS: [Step; 3] = [
    Step {
        version: 1,
        summary: "Goal hierarchy, lists, projects, actions, tasks",
        script: include_str!("v001_planner.sql"),
    },
    Step {
        version: 2,
        summary: "Communities, membership, challenges, participant checklists",
        script: include_str!("v002_community.sql"),
    },
    Step {
        version: 3,
        summary: "Shared default life areas",
        script: include_str!("v003_default_life_areas.sql"),
    },
];

const BOOKKEEPING: &str = "CREATE TABLE IF NOT EXISTS schema_version (
    version     INTEGER PRIMARY KEY,
    applied_at  TEXT    NOT NULL,
    description TEXT
)";

fn failed(context: impl std::fmt::Display) -> impl FnOnce(rusqlite::Error) -> StoreError {
    move |e| StoreError::Migration {
        message: format!("{context}: {e}"),
    }
}

impl Step {
    fn apply(&self, conn: &Connection) -> Result<()> {
        let v = self.version;
        let tx = conn.unchecked_transaction().map_err(failed(format!("v{v}: begin")))?;
        tx.execute_batch(self.script)
            .map_err(failed(format!("v{v} ({})", self.summary)))?;
        let _ = tx
            .execute(
                "INSERT INTO schema_version (version, applied_at, description) \
                 VALUES (?1, datetime('now'), ?2)",
                params![v, self.summary],
            )
            .map_err(failed(format!("v{v}: record")))?;
        tx.commit().map_err(failed(format!("v{v}: commit")))
    }
}

/// Bring the schema up to [`latest_version`]. Returns how many steps ran.
pub fn run_migrations(conn: &Connection) -> Result<u32> {
    conn.execute_batch(BOOKKEEPING)
        .map_err(failed("schema_version table"))?;
    let from = current_version(conn)?;

    let pending: Vec<&Step> = STEPS.iter().filter(|s| s.version > from).collect();
    debug!(from, pending = pending.len(), "checking schema");
    for step in &pending {
        info!(version = step.version, summary = step.summary, "applying schema step");
        step.apply(conn)?;
    }

    let applied = u32::try_from(pending.len()).unwrap_or(u32::MAX);
    if applied > 0 {
        info!(applied, to = latest_version(), "schema up to date");
    }
    Ok(applied)
}

/// Highest recorded version, 0 on a fresh database.
pub fn current_version(conn: &Connection) -> Result<u32> {
    conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |row| {
        row.get(0)
    })
    .map_err(failed("reading schema_version"))
}

/// Version of the newest step compiled in.
pub fn latest_version() -> u32 {
    STEPS.iter().map(|s| s.version).max().unwrap_or(0)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(unused_results)]
mod tests {
    use super::*;

    fn open_memory() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        conn
    }

    #[test]
    fn run_migrations_creates_all_tables() {
        let conn = open_memory();
        let applied = run_migrations(&conn).unwrap();
        assert_eq!(applied, latest_version());

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(std::result::Result::ok)
            .collect();

        for expected in [
            "annual_goals",
            "challenge_participant_tasks",
            "challenge_participants",
            "challenge_tasks",
            "challenges",
            "communities",
            "community_join_requests",
            "community_members",
            "life_areas",
            "lists",
            "long_term_visions",
            "monthly_goals",
            "project_actions",
            "projects",
            "purposes",
            "schema_version",
            "tasks",
        ] {
            assert!(tables.iter().any(|t| t == expected), "missing table {expected}");
        }
    }

    #[test]
    fn rerun_is_idempotent() {
        let conn = open_memory();
        run_migrations(&conn).unwrap();
        assert_eq!(run_migrations(&conn).unwrap(), 0);
        assert_eq!(current_version(&conn).unwrap(), latest_version());
    }

    #[test]
    fn default_life_areas_are_seeded() {
        let conn = open_memory();
        run_migrations(&conn).unwrap();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM life_areas WHERE is_default = 1 AND user_id IS NULL",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 6);
    }

    #[test]
    fn task_order_index_is_unique_per_project() {
        let conn = open_memory();
        run_migrations(&conn).unwrap();
        conn.execute_batch(
            "INSERT INTO long_term_visions VALUES ('v', 'u', 'area-default-health', 'd', '2030-01-01', 'x', 'x');
             INSERT INTO annual_goals VALUES ('a', 'u', 'v', 'd', 2026, 0, 'x', 'x');
             INSERT INTO monthly_goals VALUES ('m', 'u', 'a', 'd', 1, 0, 'x', 'x');
             INSERT INTO projects VALUES ('p', 'u', 'm', 't', 'p', 'e', 0, 'x', 'x');
             INSERT INTO tasks (id, user_id, project_id, description, order_index, created_at, updated_at)
                 VALUES ('t1', 'u', 'p', 'one', 0, 'x', 'x');",
        )
        .unwrap();
        let dup = conn.execute(
            "INSERT INTO tasks (id, user_id, project_id, description, order_index, created_at, updated_at)
             VALUES ('t2', 'u', 'p', 'two', 0, 'x', 'x')",
            [],
        );
        assert!(dup.is_err());
    }

    #[test]
    fn second_active_challenge_is_rejected_by_schema() {
        let conn = open_memory();
        run_migrations(&conn).unwrap();
        conn.execute_batch(
            "INSERT INTO communities (id, owner_id, designation, description, objective, created_at, updated_at)
                 VALUES ('c', 'u', 'd', 'd', 'o', 'x', 'x');
             INSERT INTO challenges (id, community_id, created_by, title, start_at, created_at, updated_at)
                 VALUES ('ch1', 'c', 'u', 't', 'x', 'x', 'x');",
        )
        .unwrap();
        let dup = conn.execute(
            "INSERT INTO challenges (id, community_id, created_by, title, start_at, created_at, updated_at)
             VALUES ('ch2', 'c', 'u', 't', 'x', 'x', 'x')",
            [],
        );
        assert!(dup.is_err());
    }
}
