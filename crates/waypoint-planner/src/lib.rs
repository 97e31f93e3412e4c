//! # waypoint-planner
//!
//! Personal planning for Waypoint users:
//!
//! - **Goal hierarchy**: life areas, purposes, long-term visions, annual and
//!   monthly goals, projects. Every node is owned by one user; default life
//!   areas are shared and read-only.
//! - **Lists**: entry and action lists that tasks can live in.
//! - **Ordering engine** ([`ordering`]): unique, gap-tolerant `order_index`
//!   sequences over project tasks and project actions.
//! - **Tasks and actions**: attachment rules between lists and projects, and
//!   one-way mirroring from a project action to its linked task.
//!
//! Repositories are stateless and take a `&Connection`. Services validate,
//! check ownership, and run each mutation in one `BEGIN IMMEDIATE`
//! transaction.

#![deny(unsafe_code)]

pub mod ordering;
pub mod repository;
pub mod service;
pub mod types;

pub use service::{ActionService, HierarchyService, ListService, ProjectService, TaskService};

#[cfg(test)]
pub(crate) mod testing {
    use rusqlite::{Connection, params};
    use waypoint_core::generate_id;

    pub fn setup_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        waypoint_store::run_migrations(&conn).unwrap();
        conn
    }

    /// Insert a vision → annual goal → monthly goal chain and a project on top.
    pub fn seed_project(conn: &Connection, user: &str) -> String {
        let vision = generate_id("vision");
        let annual = generate_id("annual");
        let monthly = generate_id("monthly");
        let project = generate_id("project");
        conn.execute(
            "INSERT INTO long_term_visions VALUES (?1, ?2, 'area-default-health', 'v', '2030-01-01', 'x', 'x')",
            params![vision, user],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO annual_goals VALUES (?1, ?2, ?3, 'a', 2026, 0, 'x', 'x')",
            params![annual, user, vision],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO monthly_goals VALUES (?1, ?2, ?3, 'm', 3, 0, 'x', 'x')",
            params![monthly, user, annual],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO projects VALUES (?1, ?2, ?3, 'Project', 'p', 'e', 0, 'x', 'x')",
            params![project, user, monthly],
        )
        .unwrap();
        project
    }

    pub fn seed_list(conn: &Connection, user: &str, kind: &str) -> String {
        let id = generate_id("list");
        conn.execute(
            "INSERT INTO lists VALUES (?1, ?2, 'Inbox', ?3, 'x', 'x')",
            params![id, user, kind],
        )
        .unwrap();
        id
    }
}
