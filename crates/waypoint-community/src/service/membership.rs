use rusqlite::Connection;
use tracing::info;

use waypoint_core::{DomainError, Result, UserId};
use waypoint_store::immediate;

use super::{find_community, require_manager};
use crate::repository::{JoinRequestRepository, MemberRepository};
use crate::types::{JoinOutcome, JoinRequest, Member, MemberRole, RequestStatus, Status, Visibility};

/// Joining, leaving, and managing members of a community.
pub struct MembershipService;

impl MembershipService {
    /// Join a public community, or ask to join a private one.
    pub fn join(conn: &Connection, user: &UserId, community_id: &str) -> Result<JoinOutcome> {
        immediate(conn, |tx| {
            let community = find_community(tx, community_id)?;
            if community.status != Status::Active {
                return Err(DomainError::invalid_state("community is closed"));
            }
            if MemberRepository::get(tx, community_id, user)?.is_some() {
                return Err(DomainError::invalid_state("already a member of this community"));
            }

            if community.visibility == Visibility::Public {
                MemberRepository::insert(tx, community_id, user, MemberRole::Member)?;
                info!(user_id = %user, community_id, "member joined");
                let member = MemberRepository::get(tx, community_id, user)?
                    .ok_or_else(|| DomainError::Internal("membership vanished after insert".into()))?;
                return Ok(JoinOutcome::Joined(member));
            }

            if JoinRequestRepository::for_user(tx, community_id, user)?
                .is_some_and(|r| r.status == RequestStatus::Pending)
            {
                return Err(DomainError::invalid_state("a join request is already pending"));
            }
            JoinRequestRepository::upsert_pending(tx, community_id, user)?;
            info!(user_id = %user, community_id, "join requested");
            let request = JoinRequestRepository::for_user(tx, community_id, user)?
                .ok_or_else(|| DomainError::Internal("join request vanished after upsert".into()))?;
            Ok(JoinOutcome::Requested(request))
        })
    }

    /// Pending requests, oldest first. Creator or admin only.
    pub fn join_requests(conn: &Connection, user: &UserId, community_id: &str) -> Result<Vec<JoinRequest>> {
        let _ = find_community(conn, community_id)?;
        let _ = require_manager(conn, community_id, user)?;
        JoinRequestRepository::pending(conn, community_id)
    }

    /// Accept a pending request and add the requester as a member.
    pub fn approve(conn: &Connection, user: &UserId, community_id: &str, request_id: &str) -> Result<JoinRequest> {
        Self::resolve(conn, user, community_id, request_id, RequestStatus::Approved)
    }

    /// Decline a pending request.
    pub fn reject(conn: &Connection, user: &UserId, community_id: &str, request_id: &str) -> Result<JoinRequest> {
        Self::resolve(conn, user, community_id, request_id, RequestStatus::Rejected)
    }

    fn resolve(
        conn: &Connection,
        user: &UserId,
        community_id: &str,
        request_id: &str,
        decision: RequestStatus,
    ) -> Result<JoinRequest> {
        immediate(conn, |tx| {
            let _ = find_community(tx, community_id)?;
            let _ = require_manager(tx, community_id, user)?;
            let request = JoinRequestRepository::get(tx, community_id, request_id)?
                .filter(|r| r.status == RequestStatus::Pending)
                .ok_or_else(|| DomainError::not_found("join request"))?;

            if decision == RequestStatus::Approved {
                MemberRepository::insert(tx, community_id, &request.user_id, MemberRole::Member)?;
            }
            JoinRequestRepository::resolve(tx, request_id, decision, user)?;
            info!(
                user_id = %user,
                community_id,
                requester = %request.user_id,
                decision = decision.as_sql(),
                "join request handled"
            );
            JoinRequestRepository::get(tx, community_id, request_id)?
                .ok_or_else(|| DomainError::not_found("join request"))
        })
    }

    /// Leave a community. The creator cannot leave.
    pub fn leave(conn: &Connection, user: &UserId, community_id: &str) -> Result<()> {
        immediate(conn, |tx| {
            let _ = find_community(tx, community_id)?;
            let member = MemberRepository::get(tx, community_id, user)?
                .ok_or_else(|| DomainError::not_found("membership"))?;
            if member.role == MemberRole::Creator {
                return Err(DomainError::permission_denied("the creator cannot leave the community"));
            }
            let _ = MemberRepository::delete(tx, community_id, user)?;
            info!(user_id = %user, community_id, "member left");
            Ok(())
        })
    }

    /// Remove another member. Creators can remove admins and members;
    /// admins can remove members only. Nobody removes the creator.
    pub fn remove(conn: &Connection, user: &UserId, community_id: &str, member_user_id: &str) -> Result<()> {
        immediate(conn, |tx| {
            let _ = find_community(tx, community_id)?;
            let actor = require_manager(tx, community_id, user)?;
            let target = MemberRepository::get(tx, community_id, member_user_id)?
                .ok_or_else(|| DomainError::not_found("member"))?;
            match target.role {
                MemberRole::Creator => {
                    return Err(DomainError::permission_denied("the creator cannot be removed"));
                }
                MemberRole::Admin if actor != MemberRole::Creator => {
                    return Err(DomainError::permission_denied("only the creator can remove an admin"));
                }
                _ => {}
            }
            let _ = MemberRepository::delete(tx, community_id, member_user_id)?;
            info!(user_id = %user, community_id, removed = member_user_id, "member removed");
            Ok(())
        })
    }

    /// Make a member an admin. Creator only.
    pub fn promote(conn: &Connection, user: &UserId, community_id: &str, member_user_id: &str) -> Result<Member> {
        immediate(conn, |tx| {
            let _ = find_community(tx, community_id)?;
            if MemberRepository::role(tx, community_id, user)? != Some(MemberRole::Creator) {
                return Err(DomainError::permission_denied("only the creator can promote members"));
            }
            let target = MemberRepository::get(tx, community_id, member_user_id)?
                .ok_or_else(|| DomainError::not_found("member"))?;
            if target.role != MemberRole::Member {
                return Err(DomainError::invalid_state(format!(
                    "member is already {}",
                    target.role.as_sql()
                )));
            }
            MemberRepository::set_role(tx, community_id, member_user_id, MemberRole::Admin)?;
            info!(user_id = %user, community_id, promoted = member_user_id, "member promoted");
            MemberRepository::get(tx, community_id, member_user_id)?.ok_or_else(|| DomainError::not_found("member"))
        })
    }
}

#[cfg(test)]
#[allow(unused_results)]
mod tests {
    use super::*;
    use crate::testing::{add_member, seed_community, setup_db};
    use assert_matches::assert_matches;

    #[test]
    fn public_join_adds_member_once() {
        let conn = setup_db();
        let community = seed_community(&conn, "owner", "public");
        let alice = UserId::from("alice");

        let outcome = MembershipService::join(&conn, &alice, &community).unwrap();
        assert_matches!(outcome, JoinOutcome::Joined(ref m) if m.role == MemberRole::Member);
        assert_matches!(
            MembershipService::join(&conn, &alice, &community),
            Err(DomainError::InvalidStateTransition(_))
        );
    }

    #[test]
    fn failed_approval_adds_no_member() {
        let conn = setup_db();
        let community = seed_community(&conn, "owner", "private");
        let alice = UserId::from("alice");
        let JoinOutcome::Requested(request) = MembershipService::join(&conn, &alice, &community).unwrap() else {
            panic!("private communities take requests");
        };
        conn.execute_batch(
            "CREATE TEMP TRIGGER request_resolution_fails
             BEFORE UPDATE ON community_join_requests
             BEGIN SELECT RAISE(ABORT, 'write failed'); END;",
        )
        .unwrap();

        let err = MembershipService::approve(&conn, &UserId::from("owner"), &community, &request.id).unwrap_err();
        assert!(err.is_internal());
        let members: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM community_members WHERE community_id = ?1 AND user_id = 'alice'",
                [&community],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(members, 0);

        conn.execute_batch("DROP TRIGGER request_resolution_fails;").unwrap();
        let pending = MembershipService::join_requests(&conn, &UserId::from("owner"), &community).unwrap();
        assert_eq!(pending.len(), 1);
    }

    #[test]
    fn private_join_goes_through_approval() {
        let conn = setup_db();
        let community = seed_community(&conn, "owner", "private");
        add_member(&conn, &community, "admin", "admin");
        let alice = UserId::from("alice");

        let JoinOutcome::Requested(request) = MembershipService::join(&conn, &alice, &community).unwrap() else {
            panic!("private communities take requests");
        };
        assert_eq!(request.status, RequestStatus::Pending);
        assert!(MemberRepository::get(&conn, &community, "alice").unwrap().is_none());
        assert_matches!(
            MembershipService::join(&conn, &alice, &community),
            Err(DomainError::InvalidStateTransition(_))
        );

        let admin = UserId::from("admin");
        assert_eq!(MembershipService::join_requests(&conn, &admin, &community).unwrap().len(), 1);
        let approved = MembershipService::approve(&conn, &admin, &community, &request.id).unwrap();
        assert_eq!(approved.status, RequestStatus::Approved);
        assert_eq!(approved.handled_by.as_deref(), Some("admin"));
        assert!(approved.handled_at.is_some());
        assert_eq!(
            MemberRepository::role(&conn, &community, "alice").unwrap(),
            Some(MemberRole::Member)
        );
        assert!(MembershipService::join_requests(&conn, &admin, &community).unwrap().is_empty());
    }

    #[test]
    fn rejected_requester_can_ask_again() {
        let conn = setup_db();
        let community = seed_community(&conn, "owner", "private");
        let owner = UserId::from("owner");
        let alice = UserId::from("alice");

        let JoinOutcome::Requested(first) = MembershipService::join(&conn, &alice, &community).unwrap() else {
            panic!("expected a request");
        };
        MembershipService::reject(&conn, &owner, &community, &first.id).unwrap();
        assert_matches!(
            MembershipService::approve(&conn, &owner, &community, &first.id),
            Err(DomainError::NotFound { .. })
        );

        let JoinOutcome::Requested(second) = MembershipService::join(&conn, &alice, &community).unwrap() else {
            panic!("expected a request");
        };
        assert_eq!(second.id, first.id);
        assert_eq!(second.status, RequestStatus::Pending);
        assert_eq!(second.handled_by, None);
    }

    #[test]
    fn members_cannot_handle_requests() {
        let conn = setup_db();
        let community = seed_community(&conn, "owner", "private");
        add_member(&conn, &community, "bob", "member");
        assert_matches!(
            MembershipService::join_requests(&conn, &UserId::from("bob"), &community),
            Err(DomainError::PermissionDenied(_))
        );
    }

    #[test]
    fn creator_can_never_be_removed() {
        let conn = setup_db();
        let community = seed_community(&conn, "owner", "public");
        add_member(&conn, &community, "admin", "admin");
        add_member(&conn, &community, "other", "admin");
        add_member(&conn, &community, "bob", "member");

        let owner = UserId::from("owner");
        let admin = UserId::from("admin");
        assert_matches!(MembershipService::leave(&conn, &owner, &community), Err(DomainError::PermissionDenied(_)));
        assert_matches!(
            MembershipService::remove(&conn, &admin, &community, "owner"),
            Err(DomainError::PermissionDenied(_))
        );
        assert_matches!(
            MembershipService::remove(&conn, &admin, &community, "other"),
            Err(DomainError::PermissionDenied(_))
        );

        MembershipService::remove(&conn, &admin, &community, "bob").unwrap();
        MembershipService::remove(&conn, &owner, &community, "other").unwrap();
        MembershipService::leave(&conn, &admin, &community).unwrap();

        let left: Vec<String> = MemberRepository::list(&conn, &community)
            .unwrap()
            .into_iter()
            .map(|m| m.user_id)
            .collect();
        assert_eq!(left, vec!["owner".to_string()]);
    }

    #[test]
    fn only_creator_promotes() {
        let conn = setup_db();
        let community = seed_community(&conn, "owner", "public");
        add_member(&conn, &community, "admin", "admin");
        add_member(&conn, &community, "bob", "member");

        assert_matches!(
            MembershipService::promote(&conn, &UserId::from("admin"), &community, "bob"),
            Err(DomainError::PermissionDenied(_))
        );
        let promoted = MembershipService::promote(&conn, &UserId::from("owner"), &community, "bob").unwrap();
        assert_eq!(promoted.role, MemberRole::Admin);
        assert_matches!(
            MembershipService::promote(&conn, &UserId::from("owner"), &community, "bob"),
            Err(DomainError::InvalidStateTransition(_))
        );
    }

    #[test]
    fn closed_community_refuses_joins() {
        let conn = setup_db();
        let community = seed_community(&conn, "owner", "public");
        conn.execute("UPDATE communities SET status = 'closed' WHERE id = ?1", [&community])
            .unwrap();
        assert_matches!(
            MembershipService::join(&conn, &UserId::from("alice"), &community),
            Err(DomainError::InvalidStateTransition(_))
        );
    }
}
