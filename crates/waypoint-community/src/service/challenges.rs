use chrono::{DateTime, Utc};
use rusqlite::Connection;
use tracing::{debug, info};

use waypoint_core::{DomainError, Result, UserId, generate_id};
use waypoint_store::immediate;

use super::{find_challenge, find_community, normalize_timestamp, require_manager, require_member, require_text};
use crate::repository::{ChallengeRepository, ParticipantRepository};
use crate::schedule::{is_open, time_status};
use crate::types::{
    Challenge, ChallengeParams, ChallengePatch, ChallengeView, Joined, ParticipantRole, Status,
};

const TITLE_MAX: usize = 255;

/// Challenge lifecycle and participation.
pub struct ChallengeService;

impl ChallengeService {
    /// A community's challenges by start date.
    pub fn list(conn: &Connection, community_id: &str, now: DateTime<Utc>) -> Result<Vec<ChallengeView>> {
        let _ = find_community(conn, community_id)?;
        let views: Vec<ChallengeView> = ChallengeRepository::list(conn, community_id)?
            .into_iter()
            .map(|(challenge, participant_count)| view(challenge, participant_count, now))
            .collect();
        debug!(community_id, count = views.len(), "challenges listed");
        Ok(views)
    }

    /// One challenge. Members only.
    pub fn show(
        conn: &Connection,
        user: &UserId,
        community_id: &str,
        id: &str,
        now: DateTime<Utc>,
    ) -> Result<ChallengeView> {
        let _ = find_community(conn, community_id)?;
        let _ = require_member(conn, community_id, user)?;
        let challenge = find_challenge(conn, community_id, id)?;
        let participants = ChallengeRepository::participant_count(conn, id)?;
        Ok(view(challenge, participants, now))
    }

    /// Create the community's active challenge. Creator or admin only; the
    /// community must be active and have no other active challenge.
    pub fn store(
        conn: &Connection,
        user: &UserId,
        community_id: &str,
        params: &ChallengeParams,
        now: DateTime<Utc>,
    ) -> Result<ChallengeView> {
        require_text("title", &params.title, TITLE_MAX)?;
        let start_at = normalize_timestamp("start_at", &params.start_at)?;
        let end_at = params
            .end_at
            .as_deref()
            .map(|end| normalize_timestamp("end_at", end))
            .transpose()?;
        check_window(&start_at, end_at.as_deref())?;

        immediate(conn, |tx| {
            let community = find_community(tx, community_id)?;
            if community.status != Status::Active {
                return Err(DomainError::invalid_state("community is closed"));
            }
            let _ = require_manager(tx, community_id, user)?;
            if ChallengeRepository::active_other_than(tx, community_id, None)?.is_some() {
                return Err(DomainError::invalid_state(
                    "community already has an active challenge; close it first",
                ));
            }
            let id = generate_id("challenge");
            ChallengeRepository::insert(
                tx,
                &id,
                community_id,
                user,
                params.title.trim(),
                params.description.as_deref(),
                &start_at,
                end_at.as_deref(),
            )?;
            info!(user_id = %user, community_id, challenge_id = %id, "challenge created");
            Ok(view(find_challenge(tx, community_id, &id)?, 0, now))
        })
    }

    /// Partial update. Creator or admin only. Reactivating a challenge still
    /// honors the single-active rule.
    pub fn update(
        conn: &Connection,
        user: &UserId,
        community_id: &str,
        id: &str,
        patch: &ChallengePatch,
        now: DateTime<Utc>,
    ) -> Result<ChallengeView> {
        if let Some(ref title) = patch.title {
            require_text("title", title, TITLE_MAX)?;
        }
        let mut normalized = patch.clone();
        if let Some(ref start) = patch.start_at {
            normalized.start_at = Some(normalize_timestamp("start_at", start)?);
        }
        if let Some(Some(ref end)) = patch.end_at {
            normalized.end_at = Some(Some(normalize_timestamp("end_at", end)?));
        }

        immediate(conn, |tx| {
            let current = find_challenge(tx, community_id, id)?;
            let _ = require_manager(tx, community_id, user)?;

            let start_at = normalized.start_at.as_deref().unwrap_or(&current.start_at);
            let end_at = match normalized.end_at {
                Some(ref end) => end.as_deref(),
                None => current.end_at.as_deref(),
            };
            check_window(start_at, end_at)?;

            if normalized.status == Some(Status::Active)
                && ChallengeRepository::active_other_than(tx, community_id, Some(id))?.is_some()
            {
                return Err(DomainError::invalid_state("community already has an active challenge"));
            }
            let _ = ChallengeRepository::update(tx, id, &normalized)?;
            let participants = ChallengeRepository::participant_count(tx, id)?;
            Ok(view(find_challenge(tx, community_id, id)?, participants, now))
        })
    }

    /// One-way `active → closed`. Creator or admin only.
    pub fn close(
        conn: &Connection,
        user: &UserId,
        community_id: &str,
        id: &str,
        now: DateTime<Utc>,
    ) -> Result<ChallengeView> {
        immediate(conn, |tx| {
            let challenge = find_challenge(tx, community_id, id)?;
            let _ = require_manager(tx, community_id, user)?;
            if challenge.status == Status::Closed {
                return Err(DomainError::invalid_state("challenge is already closed"));
            }
            ChallengeRepository::set_status(tx, id, Status::Closed)?;
            info!(user_id = %user, community_id, challenge_id = id, "challenge closed");
            let participants = ChallengeRepository::participant_count(tx, id)?;
            Ok(view(find_challenge(tx, community_id, id)?, participants, now))
        })
    }

    /// Join an open challenge and receive an unchecked copy of each of its
    /// tasks. The challenge's author joins with the `creator` role.
    pub fn join(
        conn: &Connection,
        user: &UserId,
        community_id: &str,
        id: &str,
        now: DateTime<Utc>,
    ) -> Result<Joined> {
        immediate(conn, |tx| {
            let _ = require_member(tx, community_id, user)?;
            let challenge = find_challenge(tx, community_id, id)?;
            if !is_open(&challenge, now) {
                return Err(DomainError::invalid_state("challenge is not open for participation"));
            }
            if ParticipantRepository::get(tx, id, user)?.is_some() {
                return Err(DomainError::invalid_state("already participating in this challenge"));
            }
            let role = if challenge.created_by == user.as_str() {
                ParticipantRole::Creator
            } else {
                ParticipantRole::Participant
            };
            let participant_id = ParticipantRepository::insert(tx, id, user, role)?;
            let fanned = ParticipantRepository::fan_out_to_participant(tx, &participant_id, id)?;
            info!(user_id = %user, challenge_id = id, tasks = fanned, "challenge joined");

            let participant = ParticipantRepository::get(tx, id, user)?
                .ok_or_else(|| DomainError::Internal("participant vanished after insert".into()))?;
            let tasks = ParticipantRepository::tasks(tx, &participant_id)?;
            Ok(Joined { participant, tasks })
        })
    }

    /// Leave a challenge, dropping the checklist. The challenge's creator
    /// cannot leave.
    pub fn leave(conn: &Connection, user: &UserId, community_id: &str, id: &str) -> Result<()> {
        immediate(conn, |tx| {
            let _ = require_member(tx, community_id, user)?;
            let _ = find_challenge(tx, community_id, id)?;
            let participant = ParticipantRepository::get(tx, id, user)?
                .ok_or_else(|| DomainError::not_found("participant"))?;
            if participant.role == ParticipantRole::Creator {
                return Err(DomainError::permission_denied("the challenge creator cannot leave it"));
            }
            let _ = ParticipantRepository::delete(tx, &participant.id)?;
            info!(user_id = %user, challenge_id = id, "challenge left");
            Ok(())
        })
    }
}

fn view(challenge: Challenge, participant_count: i64, now: DateTime<Utc>) -> ChallengeView {
    let time_status = time_status(&challenge, now);
    ChallengeView {
        challenge,
        participant_count,
        time_status,
    }
}

fn check_window(start_at: &str, end_at: Option<&str>) -> Result<()> {
    match end_at {
        Some(end) if end <= start_at => Err(DomainError::validation("end_at must be after start_at")),
        _ => Ok(()),
    }
}

#[cfg(test)]
#[allow(unused_results)]
mod tests {
    use super::*;
    use crate::testing::{add_member, at, seed_challenge, seed_community, setup_db};
    use crate::types::TimeStatus;
    use assert_matches::assert_matches;

    fn params(title: &str) -> ChallengeParams {
        ChallengeParams {
            title: title.into(),
            description: None,
            start_at: "2026-06-01".into(),
            end_at: Some("2026-06-30".into()),
        }
    }

    #[test]
    fn only_one_active_challenge_per_community() {
        let conn = setup_db();
        let community = seed_community(&conn, "owner", "public");
        let owner = UserId::from("owner");
        let now = at(2026, 6, 10);

        let first = ChallengeService::store(&conn, &owner, &community, &params("June"), now).unwrap();
        assert_eq!(first.time_status, TimeStatus::Ongoing);
        assert_matches!(
            ChallengeService::store(&conn, &owner, &community, &params("Also June"), now),
            Err(DomainError::InvalidStateTransition(_))
        );

        ChallengeService::close(&conn, &owner, &community, &first.challenge.id, now).unwrap();
        let second = ChallengeService::store(&conn, &owner, &community, &params("July"), now).unwrap();

        let reactivate = ChallengePatch {
            status: Some(Status::Active),
            ..ChallengePatch::default()
        };
        assert_matches!(
            ChallengeService::update(&conn, &owner, &community, &first.challenge.id, &reactivate, now),
            Err(DomainError::InvalidStateTransition(_))
        );
        let active: i64 = conn
            .query_row("SELECT COUNT(*) FROM challenges WHERE status = 'active'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(active, 1);
        assert_eq!(second.challenge.status, Status::Active);
    }

    #[test]
    fn members_cannot_create_and_window_must_be_ordered() {
        let conn = setup_db();
        let community = seed_community(&conn, "owner", "public");
        add_member(&conn, &community, "bob", "member");
        let now = at(2026, 6, 10);

        assert_matches!(
            ChallengeService::store(&conn, &UserId::from("bob"), &community, &params("June"), now),
            Err(DomainError::PermissionDenied(_))
        );
        let mut backwards = params("June");
        backwards.end_at = Some("2026-05-01".into());
        assert_matches!(
            ChallengeService::store(&conn, &UserId::from("owner"), &community, &backwards, now),
            Err(DomainError::Validation(_))
        );
    }

    #[test]
    fn closing_twice_is_rejected() {
        let conn = setup_db();
        let community = seed_community(&conn, "owner", "public");
        let challenge = seed_challenge(&conn, &community, "owner");
        let owner = UserId::from("owner");
        let now = at(2026, 6, 10);
        let closed = ChallengeService::close(&conn, &owner, &community, &challenge, now).unwrap();
        assert_eq!(closed.time_status, TimeStatus::Closed);
        assert_matches!(
            ChallengeService::close(&conn, &owner, &community, &challenge, now),
            Err(DomainError::InvalidStateTransition(_))
        );
    }

    #[test]
    fn join_requires_membership_and_open_window() {
        let conn = setup_db();
        let community = seed_community(&conn, "owner", "public");
        let challenge = seed_challenge(&conn, &community, "owner");
        let alice = UserId::from("alice");

        assert_matches!(
            ChallengeService::join(&conn, &alice, &community, &challenge, at(2026, 6, 10)),
            Err(DomainError::PermissionDenied(_))
        );
        add_member(&conn, &community, "alice", "member");
        assert_matches!(
            ChallengeService::join(&conn, &alice, &community, &challenge, at(2026, 5, 1)),
            Err(DomainError::InvalidStateTransition(_))
        );
        assert_matches!(
            ChallengeService::join(&conn, &alice, &community, &challenge, at(2026, 7, 15)),
            Err(DomainError::InvalidStateTransition(_))
        );

        let joined = ChallengeService::join(&conn, &alice, &community, &challenge, at(2026, 6, 10)).unwrap();
        assert_eq!(joined.participant.role, ParticipantRole::Participant);
        assert_matches!(
            ChallengeService::join(&conn, &alice, &community, &challenge, at(2026, 6, 10)),
            Err(DomainError::InvalidStateTransition(_))
        );
    }

    #[test]
    fn join_fans_out_existing_tasks() {
        let conn = setup_db();
        let community = seed_community(&conn, "owner", "public");
        let challenge = seed_challenge(&conn, &community, "owner");
        for text in ["stretch", "run"] {
            conn.execute(
                "INSERT INTO challenge_tasks (id, challenge_id, description, created_at, updated_at)
                 VALUES (?1, ?2, ?1, 'x', 'x')",
                [text, challenge.as_str()],
            )
            .unwrap();
        }
        add_member(&conn, &community, "alice", "member");

        let joined =
            ChallengeService::join(&conn, &UserId::from("alice"), &community, &challenge, at(2026, 6, 10)).unwrap();
        assert_eq!(joined.tasks.len(), 2);
        assert!(joined.tasks.iter().all(|t| !t.completed && t.completed_at.is_none()));
    }

    #[test]
    fn challenge_creator_joins_as_creator_and_cannot_leave() {
        let conn = setup_db();
        let community = seed_community(&conn, "owner", "public");
        add_member(&conn, &community, "admin", "admin");
        add_member(&conn, &community, "bob", "member");
        let admin = UserId::from("admin");
        let bob = UserId::from("bob");
        let now = at(2026, 6, 10);
        let challenge = ChallengeService::store(&conn, &admin, &community, &params("June"), now)
            .unwrap()
            .challenge
            .id;

        let joined = ChallengeService::join(&conn, &admin, &community, &challenge, now).unwrap();
        assert_eq!(joined.participant.role, ParticipantRole::Creator);
        assert_matches!(
            ChallengeService::leave(&conn, &admin, &community, &challenge),
            Err(DomainError::PermissionDenied(_))
        );

        ChallengeService::join(&conn, &bob, &community, &challenge, now).unwrap();
        ChallengeService::leave(&conn, &bob, &community, &challenge).unwrap();
        assert!(ParticipantRepository::get(&conn, &challenge, "bob").unwrap().is_none());
        assert_matches!(
            ChallengeService::leave(&conn, &bob, &community, &challenge),
            Err(DomainError::NotFound { .. })
        );
    }

    #[test]
    fn show_is_members_only_and_list_counts_participants() {
        let conn = setup_db();
        let community = seed_community(&conn, "owner", "public");
        let challenge = seed_challenge(&conn, &community, "owner");
        let now = at(2026, 6, 10);
        ChallengeService::join(&conn, &UserId::from("owner"), &community, &challenge, now).unwrap();

        assert_matches!(
            ChallengeService::show(&conn, &UserId::from("stranger"), &community, &challenge, now),
            Err(DomainError::PermissionDenied(_))
        );
        let listed = ChallengeService::list(&conn, &community, now).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].participant_count, 1);
        assert_eq!(listed[0].time_status, TimeStatus::Ongoing);
    }

    #[test]
    fn update_normalizes_and_checks_window() {
        let conn = setup_db();
        let community = seed_community(&conn, "owner", "public");
        let challenge = seed_challenge(&conn, &community, "owner");
        let owner = UserId::from("owner");
        let now = at(2026, 6, 10);

        let bad = ChallengePatch {
            start_at: Some("2026-07-05".into()),
            ..ChallengePatch::default()
        };
        assert_matches!(
            ChallengeService::update(&conn, &owner, &community, &challenge, &bad, now),
            Err(DomainError::Validation(_))
        );

        let open_ended = ChallengePatch {
            title: Some("Summer".into()),
            end_at: Some(None),
            ..ChallengePatch::default()
        };
        let updated = ChallengeService::update(&conn, &owner, &community, &challenge, &open_ended, now).unwrap();
        assert_eq!(updated.challenge.title, "Summer");
        assert_eq!(updated.challenge.end_at, None);
        assert_eq!(
            ChallengeService::update(&conn, &owner, &community, &challenge, &bad, now)
                .unwrap()
                .challenge
                .start_at,
            "2026-07-05T00:00:00Z"
        );
    }
}
