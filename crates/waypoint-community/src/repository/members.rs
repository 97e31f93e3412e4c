use rusqlite::{Connection, OptionalExtension, params};

use waypoint_core::{Result, generate_id, now_iso};

use crate::types::{JoinRequest, Member, MemberRole, RequestStatus};

/// Community memberships.
pub struct MemberRepository;

impl MemberRepository {
    /// Members of a community, oldest first.
    pub fn list(conn: &Connection, community_id: &str) -> Result<Vec<Member>> {
        let mut stmt = conn.prepare(
            "SELECT * FROM community_members WHERE community_id = ?1 ORDER BY joined_at ASC, id ASC",
        )?;
        let rows = stmt.query_map(params![community_id], |row| Ok(member_from_row(row)))?;
        Ok(rows.collect::<std::result::Result<_, _>>()?)
    }

    /// A user's membership in a community.
    pub fn get(conn: &Connection, community_id: &str, user_id: &str) -> Result<Option<Member>> {
        Ok(conn
            .query_row(
                "SELECT * FROM community_members WHERE community_id = ?1 AND user_id = ?2",
                params![community_id, user_id],
                |row| Ok(member_from_row(row)),
            )
            .optional()?)
    }

    /// The user's role, if they are a member.
    pub fn role(conn: &Connection, community_id: &str, user_id: &str) -> Result<Option<MemberRole>> {
        Ok(Self::get(conn, community_id, user_id)?.map(|m| m.role))
    }

    /// Add a member. Does nothing if the user is already one.
    pub fn insert(conn: &Connection, community_id: &str, user_id: &str, role: MemberRole) -> Result<()> {
        let now = now_iso();
        let _ = conn.execute(
            "INSERT INTO community_members (id, community_id, user_id, role, joined_at, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5, ?5)
             ON CONFLICT(community_id, user_id) DO NOTHING",
            params![generate_id("member"), community_id, user_id, role.as_sql(), now],
        )?;
        Ok(())
    }

    /// Change a member's role.
    pub fn set_role(conn: &Connection, community_id: &str, user_id: &str, role: MemberRole) -> Result<()> {
        let _ = conn.execute(
            "UPDATE community_members SET role = ?1, updated_at = ?2 WHERE community_id = ?3 AND user_id = ?4",
            params![role.as_sql(), now_iso(), community_id, user_id],
        )?;
        Ok(())
    }

    /// Remove a membership. Returns whether a row was deleted.
    pub fn delete(conn: &Connection, community_id: &str, user_id: &str) -> Result<bool> {
        let deleted = conn.execute(
            "DELETE FROM community_members WHERE community_id = ?1 AND user_id = ?2",
            params![community_id, user_id],
        )?;
        Ok(deleted > 0)
    }
}

/// Join requests for private communities.
pub struct JoinRequestRepository;

impl JoinRequestRepository {
    /// Pending requests of a community, oldest first.
    pub fn pending(conn: &Connection, community_id: &str) -> Result<Vec<JoinRequest>> {
        let mut stmt = conn.prepare(
            "SELECT * FROM community_join_requests
             WHERE community_id = ?1 AND status = 'pending'
             ORDER BY created_at ASC, id ASC",
        )?;
        let rows = stmt.query_map(params![community_id], |row| Ok(request_from_row(row)))?;
        Ok(rows.collect::<std::result::Result<_, _>>()?)
    }

    /// A request by ID within a community.
    pub fn get(conn: &Connection, community_id: &str, id: &str) -> Result<Option<JoinRequest>> {
        Ok(conn
            .query_row(
                "SELECT * FROM community_join_requests WHERE id = ?1 AND community_id = ?2",
                params![id, community_id],
                |row| Ok(request_from_row(row)),
            )
            .optional()?)
    }

    /// The user's request for a community, whatever its state.
    pub fn for_user(conn: &Connection, community_id: &str, user_id: &str) -> Result<Option<JoinRequest>> {
        Ok(conn
            .query_row(
                "SELECT * FROM community_join_requests WHERE community_id = ?1 AND user_id = ?2",
                params![community_id, user_id],
                |row| Ok(request_from_row(row)),
            )
            .optional()?)
    }

    /// Create the user's request, or reset a handled one back to pending.
    pub fn upsert_pending(conn: &Connection, community_id: &str, user_id: &str) -> Result<()> {
        let now = now_iso();
        let _ = conn.execute(
            "INSERT INTO community_join_requests
                (id, community_id, user_id, status, handled_by, handled_at, created_at, updated_at)
             VALUES (?1, ?2, ?3, 'pending', NULL, NULL, ?4, ?4)
             ON CONFLICT(community_id, user_id) DO UPDATE SET
                status = 'pending',
                handled_by = NULL,
                handled_at = NULL,
                updated_at = excluded.updated_at",
            params![generate_id("request"), community_id, user_id, now],
        )?;
        Ok(())
    }

    /// Record an admin decision.
    pub fn resolve(conn: &Connection, id: &str, status: RequestStatus, handled_by: &str) -> Result<()> {
        let now = now_iso();
        let _ = conn.execute(
            "UPDATE community_join_requests
             SET status = ?1, handled_by = ?2, handled_at = ?3, updated_at = ?3
             WHERE id = ?4",
            params![status.as_sql(), handled_by, now, id],
        )?;
        Ok(())
    }
}

fn member_from_row(row: &rusqlite::Row<'_>) -> Member {
    let role: String = row.get_unwrap("role");
    Member {
        id: row.get_unwrap("id"),
        community_id: row.get_unwrap("community_id"),
        user_id: row.get_unwrap("user_id"),
        role: MemberRole::from_sql(&role),
        joined_at: row.get_unwrap("joined_at"),
    }
}

fn request_from_row(row: &rusqlite::Row<'_>) -> JoinRequest {
    let status: String = row.get_unwrap("status");
    JoinRequest {
        id: row.get_unwrap("id"),
        community_id: row.get_unwrap("community_id"),
        user_id: row.get_unwrap("user_id"),
        status: RequestStatus::from_sql(&status),
        handled_by: row.get_unwrap("handled_by"),
        handled_at: row.get_unwrap("handled_at"),
        created_at: row.get_unwrap("created_at"),
        updated_at: row.get_unwrap("updated_at"),
    }
}
