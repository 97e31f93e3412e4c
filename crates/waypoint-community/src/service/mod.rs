//! Business rules for communities and challenges.
//!
//! Role checks follow `creator > admin > member`. Every mutation runs in one
//! [`waypoint_store::immediate`] transaction, so a fan-out that fails half
//! way leaves nothing behind.

mod challenge_tasks;
mod challenges;
mod communities;
mod membership;
mod progress;

pub use challenge_tasks::ChallengeTaskService;
pub use challenges::ChallengeService;
pub use communities::CommunityService;
pub use membership::MembershipService;
pub use progress::ProgressService;

use rusqlite::Connection;

use waypoint_core::{DomainError, Result, format_timestamp, parse_timestamp};

use crate::repository::{ChallengeRepository, CommunityRepository, MemberRepository};
use crate::types::{Challenge, Community, MemberRole};

/// Reject blank text and text longer than `max` characters.
pub(crate) fn require_text(field: &str, value: &str, max: usize) -> Result<()> {
    if value.trim().is_empty() {
        return Err(DomainError::validation(format!("{field} is required")));
    }
    if value.chars().count() > max {
        return Err(DomainError::validation(format!("{field} must be at most {max} characters")));
    }
    Ok(())
}

/// Parse a client timestamp into the stored format.
pub(crate) fn normalize_timestamp(field: &str, value: &str) -> Result<String> {
    parse_timestamp(value)
        .map(format_timestamp)
        .ok_or_else(|| DomainError::validation(format!("{field} must be a date or date-time")))
}

pub(crate) fn find_community(conn: &Connection, id: &str) -> Result<Community> {
    CommunityRepository::get(conn, id)?.ok_or_else(|| DomainError::not_found("community"))
}

pub(crate) fn find_challenge(conn: &Connection, community_id: &str, id: &str) -> Result<Challenge> {
    ChallengeRepository::get(conn, community_id, id)?.ok_or_else(|| DomainError::not_found("challenge"))
}

/// The caller's role, or `PermissionDenied` if they are not a member.
pub(crate) fn require_member(conn: &Connection, community_id: &str, user_id: &str) -> Result<MemberRole> {
    MemberRepository::role(conn, community_id, user_id)?
        .ok_or_else(|| DomainError::permission_denied("not a member of this community"))
}

/// The caller's role, which must be `creator` or `admin`.
pub(crate) fn require_manager(conn: &Connection, community_id: &str, user_id: &str) -> Result<MemberRole> {
    match MemberRepository::role(conn, community_id, user_id)? {
        Some(role) if role.can_manage() => Ok(role),
        _ => Err(DomainError::permission_denied("only the creator or an admin can do this")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn timestamps_are_normalized() {
        assert_eq!(normalize_timestamp("start_at", "2026-06-01").unwrap(), "2026-06-01T00:00:00Z");
        assert_eq!(
            normalize_timestamp("start_at", "2026-06-01T10:00:00+02:00").unwrap(),
            "2026-06-01T08:00:00Z"
        );
        assert_matches!(normalize_timestamp("start_at", "soon"), Err(DomainError::Validation(_)));
    }
}
