use chrono::NaiveDate;
use rusqlite::Connection;
use tracing::{debug, info};

use waypoint_core::{DomainError, Result, UserId};
use waypoint_store::immediate;

use super::{check_text, dedup_ids, require_ids, require_text, upsert_id};
use crate::repository::{HierarchyRepository, Level};
use crate::types::{
    AnnualGoal, AnnualGoalParams, AnnualGoalPatch, LifeArea, LifeAreaParams, LifeAreaPatch,
    LongTermVision, MonthInput, MonthlyGoal, MonthlyGoalParams, MonthlyGoalPatch, Purpose,
    PurposeParams, PurposePatch, VisionParams, VisionPatch,
};

const DESIGNATION_MAX: usize = 55;
const DESCRIPTION_MAX: usize = 250;

/// Goal hierarchy from life areas down to monthly goals.
pub struct HierarchyService;

impl HierarchyService {
    // ─────────────────────────────────────────────────────────────────────
    // Life areas
    // ─────────────────────────────────────────────────────────────────────

    /// Shared defaults plus the user's own areas.
    pub fn list_life_areas(conn: &Connection, user: &UserId) -> Result<Vec<LifeArea>> {
        HierarchyRepository::list_life_areas(conn, user)
    }

    /// A default area or one of the user's.
    pub fn get_life_area(conn: &Connection, user: &UserId, id: &str) -> Result<LifeArea> {
        HierarchyRepository::get_life_area(conn, id)?
            .filter(|a| a.is_default || a.user_id.as_deref() == Some(user.as_str()))
            .ok_or_else(|| DomainError::not_found("life area"))
    }

    /// Create or replace a user-owned area.
    pub fn store_life_area(conn: &Connection, user: &UserId, params: &LifeAreaParams) -> Result<LifeArea> {
        require_text("designation", &params.designation, DESIGNATION_MAX)?;
        require_text("icon_path", &params.icon_path, 255)?;
        immediate(conn, |tx| {
            let id = match params.id.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
                Some(id) if HierarchyRepository::get_life_area(tx, id)?.is_some() => {
                    editable_area(tx, user, id)?;
                    id.to_string()
                }
                requested => upsert_id(tx, "life_areas", user, requested, "area", "life area")?,
            };
            HierarchyRepository::upsert_life_area(tx, user, &id, params)?;
            info!(user_id = %user, life_area_id = %id, "life area stored");
            HierarchyRepository::get_life_area(tx, &id)?.ok_or_else(|| DomainError::not_found("life area"))
        })
    }

    /// Rename or re-icon one of the user's areas. Defaults are read-only.
    pub fn update_life_area(conn: &Connection, user: &UserId, id: &str, patch: &LifeAreaPatch) -> Result<LifeArea> {
        check_text("designation", patch.designation.as_ref(), DESIGNATION_MAX)?;
        check_text("icon_path", patch.icon_path.as_ref(), 255)?;
        immediate(conn, |tx| {
            editable_area(tx, user, id)?;
            let _ = HierarchyRepository::update_life_area(tx, user, id, patch)?;
            HierarchyRepository::get_life_area(tx, id)?.ok_or_else(|| DomainError::not_found("life area"))
        })
    }

    /// Delete one of the user's areas; everything under it cascades.
    pub fn delete_life_area(conn: &Connection, user: &UserId, id: &str) -> Result<()> {
        immediate(conn, |tx| {
            editable_area(tx, user, id)?;
            let _ = HierarchyRepository::delete_life_area(tx, user, id)?;
            info!(user_id = %user, life_area_id = %id, "life area deleted");
            Ok(())
        })
    }

    // ─────────────────────────────────────────────────────────────────────
    // Purposes
    // ─────────────────────────────────────────────────────────────────────

    /// The user's purposes.
    pub fn list_purposes(conn: &Connection, user: &UserId) -> Result<Vec<Purpose>> {
        HierarchyRepository::list_purposes(conn, user)
    }

    /// One of the user's purposes.
    pub fn get_purpose(conn: &Connection, user: &UserId, id: &str) -> Result<Purpose> {
        HierarchyRepository::get_purpose(conn, user, id)?.ok_or_else(|| DomainError::not_found("purpose"))
    }

    /// Create or replace a purpose under a visible life area.
    pub fn store_purpose(conn: &Connection, user: &UserId, params: &PurposeParams) -> Result<Purpose> {
        require_text("description", &params.description, DESCRIPTION_MAX)?;
        immediate(conn, |tx| {
            require_visible_area(tx, user, &params.life_area_id)?;
            let id = upsert_id(tx, "purposes", user, params.id.as_deref(), "purpose", "purpose")?;
            HierarchyRepository::upsert_purpose(tx, user, &id, params)?;
            debug!(user_id = %user, purpose_id = %id, "purpose stored");
            HierarchyRepository::get_purpose(tx, user, &id)?.ok_or_else(|| DomainError::not_found("purpose"))
        })
    }

    /// Partial purpose update.
    pub fn update_purpose(conn: &Connection, user: &UserId, id: &str, patch: &PurposePatch) -> Result<Purpose> {
        check_text("description", patch.description.as_ref(), DESCRIPTION_MAX)?;
        immediate(conn, |tx| {
            if HierarchyRepository::get_purpose(tx, user, id)?.is_none() {
                return Err(DomainError::not_found("purpose"));
            }
            if let Some(ref area) = patch.life_area_id {
                require_visible_area(tx, user, area)?;
            }
            let _ = HierarchyRepository::update_purpose(tx, user, id, patch)?;
            HierarchyRepository::get_purpose(tx, user, id)?.ok_or_else(|| DomainError::not_found("purpose"))
        })
    }

    /// Delete one of the user's purposes.
    pub fn delete_purpose(conn: &Connection, user: &UserId, id: &str) -> Result<()> {
        delete_level(conn, user, Level::Purpose, id, "purpose")
    }

    // ─────────────────────────────────────────────────────────────────────
    // Long-term visions
    // ─────────────────────────────────────────────────────────────────────

    /// The user's visions.
    pub fn list_visions(conn: &Connection, user: &UserId) -> Result<Vec<LongTermVision>> {
        HierarchyRepository::list_visions(conn, user)
    }

    /// One of the user's visions.
    pub fn get_vision(conn: &Connection, user: &UserId, id: &str) -> Result<LongTermVision> {
        HierarchyRepository::get_vision(conn, user, id)?.ok_or_else(|| DomainError::not_found("long-term vision"))
    }

    /// Create or replace a vision under a visible life area.
    pub fn store_vision(conn: &Connection, user: &UserId, params: &VisionParams) -> Result<LongTermVision> {
        require_text("description", &params.description, DESCRIPTION_MAX)?;
        require_date("deadline", &params.deadline)?;
        immediate(conn, |tx| {
            require_visible_area(tx, user, &params.life_area_id)?;
            let id = upsert_id(tx, "long_term_visions", user, params.id.as_deref(), "vision", "long-term vision")?;
            HierarchyRepository::upsert_vision(tx, user, &id, params)?;
            debug!(user_id = %user, vision_id = %id, "vision stored");
            HierarchyRepository::get_vision(tx, user, &id)?.ok_or_else(|| DomainError::not_found("long-term vision"))
        })
    }

    /// Partial vision update.
    pub fn update_vision(conn: &Connection, user: &UserId, id: &str, patch: &VisionPatch) -> Result<LongTermVision> {
        check_text("description", patch.description.as_ref(), DESCRIPTION_MAX)?;
        if let Some(ref deadline) = patch.deadline {
            require_date("deadline", deadline)?;
        }
        immediate(conn, |tx| {
            if HierarchyRepository::get_vision(tx, user, id)?.is_none() {
                return Err(DomainError::not_found("long-term vision"));
            }
            if let Some(ref area) = patch.life_area_id {
                require_visible_area(tx, user, area)?;
            }
            let _ = HierarchyRepository::update_vision(tx, user, id, patch)?;
            HierarchyRepository::get_vision(tx, user, id)?.ok_or_else(|| DomainError::not_found("long-term vision"))
        })
    }

    /// Delete one of the user's visions; its goals cascade.
    pub fn delete_vision(conn: &Connection, user: &UserId, id: &str) -> Result<()> {
        delete_level(conn, user, Level::Vision, id, "long-term vision")
    }

    // ─────────────────────────────────────────────────────────────────────
    // Annual goals
    // ─────────────────────────────────────────────────────────────────────

    /// The user's annual goals.
    pub fn list_annual_goals(conn: &Connection, user: &UserId) -> Result<Vec<AnnualGoal>> {
        HierarchyRepository::list_annual_goals(conn, user)
    }

    /// One of the user's annual goals.
    pub fn get_annual_goal(conn: &Connection, user: &UserId, id: &str) -> Result<AnnualGoal> {
        HierarchyRepository::get_annual_goal(conn, user, id)?.ok_or_else(|| DomainError::not_found("annual goal"))
    }

    /// Create or replace an annual goal under one of the user's visions.
    pub fn store_annual_goal(conn: &Connection, user: &UserId, params: &AnnualGoalParams) -> Result<AnnualGoal> {
        require_text("description", &params.description, DESCRIPTION_MAX)?;
        require_year(params.year)?;
        immediate(conn, |tx| {
            if HierarchyRepository::get_vision(tx, user, &params.long_term_vision_id)?.is_none() {
                return Err(DomainError::not_found("long-term vision"));
            }
            let id = upsert_id(tx, "annual_goals", user, params.id.as_deref(), "annual", "annual goal")?;
            HierarchyRepository::upsert_annual_goal(tx, user, &id, params)?;
            debug!(user_id = %user, annual_goal_id = %id, year = params.year, "annual goal stored");
            HierarchyRepository::get_annual_goal(tx, user, &id)?.ok_or_else(|| DomainError::not_found("annual goal"))
        })
    }

    /// Partial annual goal update.
    pub fn update_annual_goal(conn: &Connection, user: &UserId, id: &str, patch: &AnnualGoalPatch) -> Result<AnnualGoal> {
        check_text("description", patch.description.as_ref(), DESCRIPTION_MAX)?;
        if let Some(year) = patch.year {
            require_year(year)?;
        }
        immediate(conn, |tx| {
            if HierarchyRepository::get_annual_goal(tx, user, id)?.is_none() {
                return Err(DomainError::not_found("annual goal"));
            }
            if let Some(ref vision) = patch.long_term_vision_id {
                if HierarchyRepository::get_vision(tx, user, vision)?.is_none() {
                    return Err(DomainError::not_found("long-term vision"));
                }
            }
            let _ = HierarchyRepository::update_annual_goal(tx, user, id, patch)?;
            HierarchyRepository::get_annual_goal(tx, user, id)?.ok_or_else(|| DomainError::not_found("annual goal"))
        })
    }

    /// Delete one of the user's annual goals.
    pub fn delete_annual_goal(conn: &Connection, user: &UserId, id: &str) -> Result<()> {
        delete_level(conn, user, Level::AnnualGoal, id, "annual goal")
    }

    // ─────────────────────────────────────────────────────────────────────
    // Monthly goals
    // ─────────────────────────────────────────────────────────────────────

    /// The user's monthly goals.
    pub fn list_monthly_goals(conn: &Connection, user: &UserId) -> Result<Vec<MonthlyGoal>> {
        HierarchyRepository::list_monthly_goals(conn, user)
    }

    /// One of the user's monthly goals.
    pub fn get_monthly_goal(conn: &Connection, user: &UserId, id: &str) -> Result<MonthlyGoal> {
        HierarchyRepository::get_monthly_goal(conn, user, id)?.ok_or_else(|| DomainError::not_found("monthly goal"))
    }

    /// Create or replace a monthly goal under one of the user's annual goals.
    pub fn store_monthly_goal(conn: &Connection, user: &UserId, params: &MonthlyGoalParams) -> Result<MonthlyGoal> {
        require_text("description", &params.description, DESCRIPTION_MAX)?;
        let month = parse_month(&params.month)?;
        immediate(conn, |tx| {
            if HierarchyRepository::get_annual_goal(tx, user, &params.annual_goal_id)?.is_none() {
                return Err(DomainError::not_found("annual goal"));
            }
            let id = upsert_id(tx, "monthly_goals", user, params.id.as_deref(), "monthly", "monthly goal")?;
            HierarchyRepository::upsert_monthly_goal(tx, user, &id, params, month)?;
            debug!(user_id = %user, monthly_goal_id = %id, month, "monthly goal stored");
            HierarchyRepository::get_monthly_goal(tx, user, &id)?.ok_or_else(|| DomainError::not_found("monthly goal"))
        })
    }

    /// Partial monthly goal update.
    pub fn update_monthly_goal(
        conn: &Connection,
        user: &UserId,
        id: &str,
        patch: &MonthlyGoalPatch,
    ) -> Result<MonthlyGoal> {
        check_text("description", patch.description.as_ref(), DESCRIPTION_MAX)?;
        let month = patch.month.as_ref().map(parse_month).transpose()?;
        immediate(conn, |tx| {
            if HierarchyRepository::get_monthly_goal(tx, user, id)?.is_none() {
                return Err(DomainError::not_found("monthly goal"));
            }
            if let Some(ref annual) = patch.annual_goal_id {
                if HierarchyRepository::get_annual_goal(tx, user, annual)?.is_none() {
                    return Err(DomainError::not_found("annual goal"));
                }
            }
            let _ = HierarchyRepository::update_monthly_goal(tx, user, id, patch, month)?;
            HierarchyRepository::get_monthly_goal(tx, user, id)?.ok_or_else(|| DomainError::not_found("monthly goal"))
        })
    }

    /// Delete one of the user's monthly goals; its projects cascade.
    pub fn delete_monthly_goal(conn: &Connection, user: &UserId, id: &str) -> Result<()> {
        delete_level(conn, user, Level::MonthlyGoal, id, "monthly goal")
    }

    /// Delete several monthly goals. IDs the user doesn't own are skipped;
    /// if none match the call fails with not found.
    pub fn delete_monthly_goals(conn: &Connection, user: &UserId, ids: &[String]) -> Result<usize> {
        require_ids(ids)?;
        let ids = dedup_ids(ids);
        immediate(conn, |tx| {
            let deleted = HierarchyRepository::delete_owned_many(tx, Level::MonthlyGoal, user, &ids)?;
            if deleted == 0 {
                return Err(DomainError::not_found("monthly goal"));
            }
            info!(user_id = %user, deleted, "monthly goals deleted");
            Ok(deleted)
        })
    }
}

/// Parse a month given as 1–12, a numeric string, or a month name.
///
/// Names are matched in Portuguese and English, ignoring case and accents.
pub fn parse_month(input: &MonthInput) -> Result<u8> {
    let number = match input {
        MonthInput::Number(n) => Some(*n),
        MonthInput::Name(name) => {
            let folded = fold(name);
            folded.parse::<i64>().ok().or_else(|| month_by_name(&folded))
        }
    };
    number
        .and_then(|n| u8::try_from(n).ok())
        .filter(|n| (1..=12).contains(n))
        .ok_or_else(|| DomainError::validation("month must be a month name or a number from 1 to 12"))
}

const MONTH_NAMES: [[&str; 2]; 12] = [
    ["janeiro", "january"],
    ["fevereiro", "february"],
    ["marco", "march"],
    ["abril", "april"],
    ["maio", "may"],
    ["junho", "june"],
    ["julho", "july"],
    ["agosto", "august"],
    ["setembro", "september"],
    ["outubro", "october"],
    ["novembro", "november"],
    ["dezembro", "december"],
];

fn month_by_name(folded: &str) -> Option<i64> {
    (1_i64..)
        .zip(MONTH_NAMES.iter())
        .find(|(_, names)| names.contains(&folded))
        .map(|(n, _)| n)
}

fn fold(s: &str) -> String {
    s.trim()
        .chars()
        .flat_map(char::to_lowercase)
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'í' | 'ì' | 'î' | 'ï' => 'i',
            'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
            'ú' | 'ù' | 'û' | 'ü' => 'u',
            'ç' => 'c',
            other => other,
        })
        .collect()
}

fn editable_area(conn: &Connection, user: &str, id: &str) -> Result<()> {
    match HierarchyRepository::get_life_area(conn, id)? {
        Some(area) if area.is_default => Err(DomainError::permission_denied("default life areas are read-only")),
        Some(area) if area.user_id.as_deref() == Some(user) => Ok(()),
        _ => Err(DomainError::not_found("life area")),
    }
}

fn require_visible_area(conn: &Connection, user: &str, id: &str) -> Result<()> {
    if HierarchyRepository::life_area_visible(conn, user, id)? {
        Ok(())
    } else {
        Err(DomainError::not_found("life area"))
    }
}

fn require_date(field: &str, value: &str) -> Result<()> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map(|_| ())
        .map_err(|_| DomainError::validation(format!("{field} must be a date (YYYY-MM-DD)")))
}

fn require_year(year: i32) -> Result<()> {
    if (1900..=9999).contains(&year) {
        Ok(())
    } else {
        Err(DomainError::validation("year must be between 1900 and 9999"))
    }
}

fn delete_level(conn: &Connection, user: &UserId, level: Level, id: &str, entity: &'static str) -> Result<()> {
    immediate(conn, |tx| {
        if !HierarchyRepository::delete_owned(tx, level, user, id)? {
            return Err(DomainError::not_found(entity));
        }
        info!(user_id = %user, id, entity, "hierarchy node deleted");
        Ok(())
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
