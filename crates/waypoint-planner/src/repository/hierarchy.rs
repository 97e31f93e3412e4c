use rusqlite::{Connection, OptionalExtension, params, params_from_iter};

use waypoint_core::{Result, now_iso};

use super::{Changes, placeholders};
use crate::types::{
    AnnualGoal, AnnualGoalParams, AnnualGoalPatch, LifeArea, LifeAreaParams, LifeAreaPatch,
    LongTermVision, MonthlyGoal, MonthlyGoalParams, MonthlyGoalPatch, Purpose, PurposeParams,
    PurposePatch, VisionParams, VisionPatch,
};

/// Life areas, purposes, visions, annual and monthly goals.
pub struct HierarchyRepository;

impl HierarchyRepository {
    // ─────────────────────────────────────────────────────────────────────
    // Life areas
    // ─────────────────────────────────────────────────────────────────────

    /// Default areas followed by the user's own, oldest first.
    pub fn list_life_areas(conn: &Connection, user_id: &str) -> Result<Vec<LifeArea>> {
        let mut stmt = conn.prepare(
            "SELECT * FROM life_areas WHERE is_default = 1 OR user_id = ?1
             ORDER BY is_default DESC, created_at ASC, id ASC",
        )?;
        let rows = stmt.query_map(params![user_id], |row| Ok(life_area_from_row(row)))?;
        Ok(rows.collect::<std::result::Result<_, _>>()?)
    }

    /// A life area by ID regardless of owner.
    pub fn get_life_area(conn: &Connection, id: &str) -> Result<Option<LifeArea>> {
        Ok(conn
            .query_row("SELECT * FROM life_areas WHERE id = ?1", params![id], |row| {
                Ok(life_area_from_row(row))
            })
            .optional()?)
    }

    /// Whether `id` is a default area or one owned by `user_id`.
    pub fn life_area_visible(conn: &Connection, user_id: &str, id: &str) -> Result<bool> {
        let found: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM life_areas WHERE id = ?1 AND (is_default = 1 OR user_id = ?2)",
                params![id, user_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Insert or replace a user-owned area.
    pub fn upsert_life_area(conn: &Connection, user_id: &str, id: &str, p: &LifeAreaParams) -> Result<()> {
        let now = now_iso();
        let _ = conn.execute(
            "INSERT INTO life_areas (id, user_id, designation, icon_path, is_default, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, 0, ?5, ?5)
             ON CONFLICT(id) DO UPDATE SET
                designation = excluded.designation,
                icon_path = excluded.icon_path,
                updated_at = excluded.updated_at
             WHERE life_areas.user_id = excluded.user_id",
            params![id, user_id, p.designation, p.icon_path, now],
        )?;
        Ok(())
    }

    /// Partial update of a user-owned area.
    pub fn update_life_area(conn: &Connection, user_id: &str, id: &str, patch: &LifeAreaPatch) -> Result<bool> {
        let mut changes = Changes::new();
        changes.set_some("designation", patch.designation.as_ref());
        changes.set_some("icon_path", patch.icon_path.as_ref());
        Ok(changes.apply(conn, "life_areas", id, Some(user_id))?)
    }

    /// Delete a user-owned area. Defaults have no owner and never match.
    pub fn delete_life_area(conn: &Connection, user_id: &str, id: &str) -> Result<bool> {
        let changed = conn.execute(
            "DELETE FROM life_areas WHERE id = ?1 AND user_id = ?2 AND is_default = 0",
            params![id, user_id],
        )?;
        Ok(changed > 0)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Purposes
    // ─────────────────────────────────────────────────────────────────────

    /// The user's purposes, newest first.
    pub fn list_purposes(conn: &Connection, user_id: &str) -> Result<Vec<Purpose>> {
        let mut stmt = conn.prepare("SELECT * FROM purposes WHERE user_id = ?1 ORDER BY created_at DESC, id")?;
        let rows = stmt.query_map(params![user_id], |row| Ok(purpose_from_row(row)))?;
        Ok(rows.collect::<std::result::Result<_, _>>()?)
    }

    /// One of the user's purposes.
    pub fn get_purpose(conn: &Connection, user_id: &str, id: &str) -> Result<Option<Purpose>> {
        Ok(conn
            .query_row(
                "SELECT * FROM purposes WHERE id = ?1 AND user_id = ?2",
                params![id, user_id],
                |row| Ok(purpose_from_row(row)),
            )
            .optional()?)
    }

    /// Insert or replace a purpose.
    pub fn upsert_purpose(conn: &Connection, user_id: &str, id: &str, p: &PurposeParams) -> Result<()> {
        let now = now_iso();
        let _ = conn.execute(
            "INSERT INTO purposes (id, user_id, life_area_id, description, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)
             ON CONFLICT(id) DO UPDATE SET
                life_area_id = excluded.life_area_id,
                description = excluded.description,
                updated_at = excluded.updated_at
             WHERE purposes.user_id = excluded.user_id",
            params![id, user_id, p.life_area_id, p.description, now],
        )?;
        Ok(())
    }

    /// Partial purpose update.
    pub fn update_purpose(conn: &Connection, user_id: &str, id: &str, patch: &PurposePatch) -> Result<bool> {
        let mut changes = Changes::new();
        changes.set_some("life_area_id", patch.life_area_id.as_ref());
        changes.set_some("description", patch.description.as_ref());
        Ok(changes.apply(conn, "purposes", id, Some(user_id))?)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Long-term visions
    // ─────────────────────────────────────────────────────────────────────

    /// The user's visions, nearest deadline first.
    pub fn list_visions(conn: &Connection, user_id: &str) -> Result<Vec<LongTermVision>> {
        let mut stmt = conn.prepare(
            "SELECT * FROM long_term_visions WHERE user_id = ?1 ORDER BY deadline ASC, created_at DESC",
        )?;
        let rows = stmt.query_map(params![user_id], |row| Ok(vision_from_row(row)))?;
        Ok(rows.collect::<std::result::Result<_, _>>()?)
    }

    /// One of the user's visions.
    pub fn get_vision(conn: &Connection, user_id: &str, id: &str) -> Result<Option<LongTermVision>> {
        Ok(conn
            .query_row(
                "SELECT * FROM long_term_visions WHERE id = ?1 AND user_id = ?2",
                params![id, user_id],
                |row| Ok(vision_from_row(row)),
            )
            .optional()?)
    }

    /// Insert or replace a vision.
    pub fn upsert_vision(conn: &Connection, user_id: &str, id: &str, p: &VisionParams) -> Result<()> {
        let now = now_iso();
        let _ = conn.execute(
            "INSERT INTO long_term_visions (id, user_id, life_area_id, description, deadline, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
             ON CONFLICT(id) DO UPDATE SET
                life_area_id = excluded.life_area_id,
                description = excluded.description,
                deadline = excluded.deadline,
                updated_at = excluded.updated_at
             WHERE long_term_visions.user_id = excluded.user_id",
            params![id, user_id, p.life_area_id, p.description, p.deadline, now],
        )?;
        Ok(())
    }

    /// Partial vision update.
    pub fn update_vision(conn: &Connection, user_id: &str, id: &str, patch: &VisionPatch) -> Result<bool> {
        let mut changes = Changes::new();
        changes.set_some("life_area_id", patch.life_area_id.as_ref());
        changes.set_some("description", patch.description.as_ref());
        changes.set_some("deadline", patch.deadline.as_ref());
        Ok(changes.apply(conn, "long_term_visions", id, Some(user_id))?)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Annual goals
    // ─────────────────────────────────────────────────────────────────────

    /// The user's annual goals by year, then newest.
    pub fn list_annual_goals(conn: &Connection, user_id: &str) -> Result<Vec<AnnualGoal>> {
        let mut stmt =
            conn.prepare("SELECT * FROM annual_goals WHERE user_id = ?1 ORDER BY year ASC, created_at DESC")?;
        let rows = stmt.query_map(params![user_id], |row| Ok(annual_goal_from_row(row)))?;
        Ok(rows.collect::<std::result::Result<_, _>>()?)
    }

    /// One of the user's annual goals.
    pub fn get_annual_goal(conn: &Connection, user_id: &str, id: &str) -> Result<Option<AnnualGoal>> {
        Ok(conn
            .query_row(
                "SELECT * FROM annual_goals WHERE id = ?1 AND user_id = ?2",
                params![id, user_id],
                |row| Ok(annual_goal_from_row(row)),
            )
            .optional()?)
    }

    /// Insert or replace an annual goal.
    pub fn upsert_annual_goal(conn: &Connection, user_id: &str, id: &str, p: &AnnualGoalParams) -> Result<()> {
        let now = now_iso();
        let _ = conn.execute(
            "INSERT INTO annual_goals (id, user_id, long_term_vision_id, description, year, status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
             ON CONFLICT(id) DO UPDATE SET
                long_term_vision_id = excluded.long_term_vision_id,
                description = excluded.description,
                year = excluded.year,
                status = excluded.status,
                updated_at = excluded.updated_at
             WHERE annual_goals.user_id = excluded.user_id",
            params![id, user_id, p.long_term_vision_id, p.description, p.year, p.status, now],
        )?;
        Ok(())
    }

    /// Partial annual goal update.
    pub fn update_annual_goal(conn: &Connection, user_id: &str, id: &str, patch: &AnnualGoalPatch) -> Result<bool> {
        let mut changes = Changes::new();
        changes.set_some("long_term_vision_id", patch.long_term_vision_id.as_ref());
        changes.set_some("description", patch.description.as_ref());
        changes.set_some("year", patch.year.as_ref());
        changes.set_some("status", patch.status.as_ref());
        Ok(changes.apply(conn, "annual_goals", id, Some(user_id))?)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Monthly goals
    // ─────────────────────────────────────────────────────────────────────

    /// The user's monthly goals by month, then newest.
    pub fn list_monthly_goals(conn: &Connection, user_id: &str) -> Result<Vec<MonthlyGoal>> {
        let mut stmt =
            conn.prepare("SELECT * FROM monthly_goals WHERE user_id = ?1 ORDER BY month ASC, created_at DESC")?;
        let rows = stmt.query_map(params![user_id], |row| Ok(monthly_goal_from_row(row)))?;
        Ok(rows.collect::<std::result::Result<_, _>>()?)
    }

    /// One of the user's monthly goals.
    pub fn get_monthly_goal(conn: &Connection, user_id: &str, id: &str) -> Result<Option<MonthlyGoal>> {
        Ok(conn
            .query_row(
                "SELECT * FROM monthly_goals WHERE id = ?1 AND user_id = ?2",
                params![id, user_id],
                |row| Ok(monthly_goal_from_row(row)),
            )
            .optional()?)
    }

    /// Insert or replace a monthly goal; `month` is already resolved to 1–12.
    pub fn upsert_monthly_goal(
        conn: &Connection,
        user_id: &str,
        id: &str,
        p: &MonthlyGoalParams,
        month: u8,
    ) -> Result<()> {
        let now = now_iso();
        let _ = conn.execute(
            "INSERT INTO monthly_goals (id, user_id, annual_goal_id, description, month, status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
             ON CONFLICT(id) DO UPDATE SET
                annual_goal_id = excluded.annual_goal_id,
                description = excluded.description,
                month = excluded.month,
                status = excluded.status,
                updated_at = excluded.updated_at
             WHERE monthly_goals.user_id = excluded.user_id",
            params![id, user_id, p.annual_goal_id, p.description, month, p.status, now],
        )?;
        Ok(())
    }

    /// Partial monthly goal update.
    pub fn update_monthly_goal(
        conn: &Connection,
        user_id: &str,
        id: &str,
        patch: &MonthlyGoalPatch,
        month: Option<u8>,
    ) -> Result<bool> {
        let mut changes = Changes::new();
        changes.set_some("annual_goal_id", patch.annual_goal_id.as_ref());
        changes.set_some("description", patch.description.as_ref());
        changes.set_some("month", month.as_ref());
        changes.set_some("status", patch.status.as_ref());
        Ok(changes.apply(conn, "monthly_goals", id, Some(user_id))?)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Deletes
    // ─────────────────────────────────────────────────────────────────────

    /// Delete one of the user's rows from a hierarchy table.
    pub fn delete_owned(conn: &Connection, table: Level, user_id: &str, id: &str) -> Result<bool> {
        let sql = format!("DELETE FROM {} WHERE id = ?1 AND user_id = ?2", table.table());
        Ok(conn.execute(&sql, params![id, user_id])? > 0)
    }

    /// Delete several of the user's rows; IDs owned by others are skipped.
    pub fn delete_owned_many(conn: &Connection, table: Level, user_id: &str, ids: &[String]) -> Result<usize> {
        if ids.is_empty() {
            return Ok(0);
        }
        let sql = format!(
            "DELETE FROM {} WHERE user_id = ? AND id IN ({})",
            table.table(),
            placeholders(ids.len())
        );
        let values = std::iter::once(user_id).chain(ids.iter().map(String::as_str));
        Ok(conn.execute(&sql, params_from_iter(values))?)
    }
}

/// Hierarchy tables with a `user_id` owner column.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Level {
    /// `purposes`
    Purpose,
    /// `long_term_visions`
    Vision,
    /// `annual_goals`
    AnnualGoal,
    /// `monthly_goals`
    MonthlyGoal,
}

impl Level {
    fn table(self) -> &'static str {
        match self {
            Self::Purpose => "purposes",
            Self::Vision => "long_term_visions",
            Self::AnnualGoal => "annual_goals",
            Self::MonthlyGoal => "monthly_goals",
        }
    }
}

fn life_area_from_row(row: &rusqlite::Row<'_>) -> LifeArea {
    let is_default: i64 = row.get_unwrap("is_default");
    LifeArea {
        id: row.get_unwrap("id"),
        user_id: row.get_unwrap("user_id"),
        designation: row.get_unwrap("designation"),
        icon_path: row.get_unwrap("icon_path"),
        is_default: is_default != 0,
        created_at: row.get_unwrap("created_at"),
        updated_at: row.get_unwrap("updated_at"),
    }
}

fn purpose_from_row(row: &rusqlite::Row<'_>) -> Purpose {
    Purpose {
        id: row.get_unwrap("id"),
        user_id: row.get_unwrap("user_id"),
        life_area_id: row.get_unwrap("life_area_id"),
        description: row.get_unwrap("description"),
        created_at: row.get_unwrap("created_at"),
        updated_at: row.get_unwrap("updated_at"),
    }
}

fn vision_from_row(row: &rusqlite::Row<'_>) -> LongTermVision {
    LongTermVision {
        id: row.get_unwrap("id"),
        user_id: row.get_unwrap("user_id"),
        life_area_id: row.get_unwrap("life_area_id"),
        description: row.get_unwrap("description"),
        deadline: row.get_unwrap("deadline"),
        created_at: row.get_unwrap("created_at"),
        updated_at: row.get_unwrap("updated_at"),
    }
}

fn annual_goal_from_row(row: &rusqlite::Row<'_>) -> AnnualGoal {
    let status: i64 = row.get_unwrap("status");
    AnnualGoal {
        id: row.get_unwrap("id"),
        user_id: row.get_unwrap("user_id"),
        long_term_vision_id: row.get_unwrap("long_term_vision_id"),
        description: row.get_unwrap("description"),
        year: row.get_unwrap("year"),
        status: status != 0,
        created_at: row.get_unwrap("created_at"),
        updated_at: row.get_unwrap("updated_at"),
    }
}

fn monthly_goal_from_row(row: &rusqlite::Row<'_>) -> MonthlyGoal {
    let status: i64 = row.get_unwrap("status");
    MonthlyGoal {
        id: row.get_unwrap("id"),
        user_id: row.get_unwrap("user_id"),
        annual_goal_id: row.get_unwrap("annual_goal_id"),
        description: row.get_unwrap("description"),
        month: row.get_unwrap("month"),
        status: status != 0,
        created_at: row.get_unwrap("created_at"),
        updated_at: row.get_unwrap("updated_at"),
    }
}
