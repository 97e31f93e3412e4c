use rusqlite::types::ToSql;
use rusqlite::{Connection, OptionalExtension, params};

use waypoint_core::{Result, now_iso};
use waypoint_store::Changes;

use crate::types::{Community, CommunityFilter, CommunityParams, CommunityPatch, Status, Visibility};

const COMMUNITY_SELECT: &str = "SELECT c.*, la.designation AS life_area_designation,
        (SELECT COUNT(*) FROM community_members m WHERE m.community_id = c.id) AS member_count
    FROM communities c
    LEFT JOIN life_areas la ON la.id = c.life_area_id";

/// Communities and their aggregate fields.
pub struct CommunityRepository;

impl CommunityRepository {
    /// Active communities matching `filter`, newest first. With `member`,
    /// only communities that user belongs to.
    pub fn list(conn: &Connection, filter: &CommunityFilter, member: Option<&str>) -> Result<Vec<Community>> {
        let mut conditions = vec!["c.status = 'active'".to_string()];
        let mut values: Vec<Box<dyn ToSql>> = Vec::new();

        if let Some(user) = member {
            conditions.push(
                "EXISTS (SELECT 1 FROM community_members m WHERE m.community_id = c.id AND m.user_id = ?)".into(),
            );
            values.push(Box::new(user.to_string()));
        }
        if let Some(area) = non_blank(filter.life_area_id.as_ref()) {
            conditions.push("c.life_area_id = ?".into());
            values.push(Box::new(area.to_string()));
        }
        if let Some(objective) = non_blank(filter.objective.as_ref()) {
            conditions.push("c.objective LIKE ?".into());
            values.push(Box::new(like(objective)));
        }
        if let Some(category) = non_blank(filter.category.as_ref()) {
            conditions.push("la.designation LIKE ?".into());
            values.push(Box::new(like(category)));
        }
        if let Some(term) = non_blank(filter.q.as_ref()) {
            conditions.push(
                "(c.designation LIKE ? OR c.description LIKE ? OR c.objective LIKE ? OR la.designation LIKE ?)".into(),
            );
            for _ in 0..4 {
                values.push(Box::new(like(term)));
            }
        }

        let sql = format!(
            "{COMMUNITY_SELECT} WHERE {} ORDER BY c.created_at DESC, c.id DESC",
            conditions.join(" AND ")
        );
        let params_refs: Vec<&dyn ToSql> = values.iter().map(AsRef::as_ref).collect();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_refs.as_slice(), |row| Ok(community_from_row(row)))?;
        Ok(rows.collect::<std::result::Result<_, _>>()?)
    }

    /// One community, any status.
    pub fn get(conn: &Connection, id: &str) -> Result<Option<Community>> {
        let sql = format!("{COMMUNITY_SELECT} WHERE c.id = ?1");
        Ok(conn
            .query_row(&sql, params![id], |row| Ok(community_from_row(row)))
            .optional()?)
    }

    /// Insert a new active community.
    pub fn insert(conn: &Connection, id: &str, owner_id: &str, p: &CommunityParams) -> Result<()> {
        let now = now_iso();
        let _ = conn.execute(
            "INSERT INTO communities
                (id, owner_id, life_area_id, designation, description, objective, whatsapp_link,
                 visibility, status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 'active', ?9, ?9)",
            params![
                id,
                owner_id,
                p.life_area_id,
                p.designation.trim(),
                p.description,
                p.objective,
                p.whatsapp_link,
                p.visibility.as_sql(),
                now
            ],
        )?;
        Ok(())
    }

    /// Partial community update.
    pub fn update(conn: &Connection, id: &str, patch: &CommunityPatch) -> Result<bool> {
        let mut changes = Changes::new();
        changes.set_some("life_area_id", patch.life_area_id.as_ref());
        if let Some(ref designation) = patch.designation {
            changes.set("designation", designation.trim().to_string());
        }
        changes.set_some("description", patch.description.as_ref());
        changes.set_some("objective", patch.objective.as_ref());
        if let Some(visibility) = patch.visibility {
            changes.set("visibility", visibility.as_sql());
        }
        if let Some(ref link) = patch.whatsapp_link {
            changes.set("whatsapp_link", link.clone());
        }
        Ok(changes.apply(conn, "communities", id, None)?)
    }

    /// Move to `status`.
    pub fn set_status(conn: &Connection, id: &str, status: Status) -> Result<()> {
        let _ = conn.execute(
            "UPDATE communities SET status = ?1, updated_at = ?2 WHERE id = ?3",
            params![status.as_sql(), now_iso(), id],
        )?;
        Ok(())
    }
}

fn non_blank(value: Option<&String>) -> Option<&str> {
    value.map(|s| s.trim()).filter(|s| !s.is_empty())
}

fn like(term: &str) -> String {
    format!("%{term}%")
}

fn community_from_row(row: &rusqlite::Row<'_>) -> Community {
    let visibility: String = row.get_unwrap("visibility");
    let status: String = row.get_unwrap("status");
    Community {
        id: row.get_unwrap("id"),
        owner_id: row.get_unwrap("owner_id"),
        life_area_id: row.get_unwrap("life_area_id"),
        life_area_designation: row.get_unwrap("life_area_designation"),
        designation: row.get_unwrap("designation"),
        description: row.get_unwrap("description"),
        objective: row.get_unwrap("objective"),
        whatsapp_link: row.get_unwrap("whatsapp_link"),
        visibility: Visibility::from_sql(&visibility),
        status: Status::from_sql(&status),
        member_count: row.get_unwrap("member_count"),
        created_at: row.get_unwrap("created_at"),
        updated_at: row.get_unwrap("updated_at"),
    }
}
