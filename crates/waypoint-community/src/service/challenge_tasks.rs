use chrono::{DateTime, Utc};
use rusqlite::Connection;
use tracing::info;

use waypoint_core::{DomainError, Result, UserId, format_timestamp};
use waypoint_store::immediate;

use super::{find_challenge, require_manager, require_member, require_text};
use crate::repository::{ChallengeTaskRepository, ParticipantRepository};
use crate::types::{ChallengeTask, ChallengeTaskParams, ParticipantTask, Status};

const DESCRIPTION_MAX: usize = 255;

/// Challenge tasks and per-participant checklists.
pub struct ChallengeTaskService;

impl ChallengeTaskService {
    /// Tasks of a challenge in creation order. Members only.
    pub fn list(conn: &Connection, user: &UserId, community_id: &str, challenge_id: &str) -> Result<Vec<ChallengeTask>> {
        let _ = require_member(conn, community_id, user)?;
        let _ = find_challenge(conn, community_id, challenge_id)?;
        ChallengeTaskRepository::list(conn, challenge_id)
    }

    /// One task. Members only.
    pub fn show(
        conn: &Connection,
        user: &UserId,
        community_id: &str,
        challenge_id: &str,
        id: &str,
    ) -> Result<ChallengeTask> {
        let _ = require_member(conn, community_id, user)?;
        let _ = find_challenge(conn, community_id, challenge_id)?;
        find_task(conn, challenge_id, id)
    }

    /// Add a task to an active challenge and hand an unchecked copy to every
    /// current participant. Creator or admin only.
    pub fn store(
        conn: &Connection,
        user: &UserId,
        community_id: &str,
        challenge_id: &str,
        params: &ChallengeTaskParams,
    ) -> Result<ChallengeTask> {
        require_text("description", &params.description, DESCRIPTION_MAX)?;
        immediate(conn, |tx| {
            let _ = require_manager(tx, community_id, user)?;
            let challenge = find_challenge(tx, community_id, challenge_id)?;
            if challenge.status != Status::Active {
                return Err(DomainError::invalid_state("tasks can only be added to an active challenge"));
            }
            let id = ChallengeTaskRepository::insert(tx, challenge_id, params.description.trim())?;
            let fanned = ParticipantRepository::fan_out_task(tx, &id, challenge_id)?;
            info!(user_id = %user, challenge_id, task_id = %id, participants = fanned, "challenge task added");
            find_task(tx, challenge_id, &id)
        })
    }

    /// Replace a task's text. Creator or admin only.
    pub fn update(
        conn: &Connection,
        user: &UserId,
        community_id: &str,
        challenge_id: &str,
        id: &str,
        params: &ChallengeTaskParams,
    ) -> Result<ChallengeTask> {
        require_text("description", &params.description, DESCRIPTION_MAX)?;
        immediate(conn, |tx| {
            let _ = require_manager(tx, community_id, user)?;
            let _ = find_challenge(tx, community_id, challenge_id)?;
            let _ = find_task(tx, challenge_id, id)?;
            ChallengeTaskRepository::set_description(tx, id, params.description.trim())?;
            find_task(tx, challenge_id, id)
        })
    }

    /// Delete a task and every participant's row for it. Creator or admin only.
    pub fn delete(conn: &Connection, user: &UserId, community_id: &str, challenge_id: &str, id: &str) -> Result<()> {
        immediate(conn, |tx| {
            let _ = require_manager(tx, community_id, user)?;
            let _ = find_challenge(tx, community_id, challenge_id)?;
            let _ = find_task(tx, challenge_id, id)?;
            let _ = ChallengeTaskRepository::delete(tx, id)?;
            info!(user_id = %user, challenge_id, task_id = id, "challenge task deleted");
            Ok(())
        })
    }

    /// Flip the caller's completion of one task. Checking records `now` as
    /// `completed_at`; unchecking clears it.
    pub fn toggle(
        conn: &Connection,
        user: &UserId,
        community_id: &str,
        challenge_id: &str,
        task_id: &str,
        now: DateTime<Utc>,
    ) -> Result<ParticipantTask> {
        immediate(conn, |tx| {
            let _ = find_challenge(tx, community_id, challenge_id)?;
            let participant = ParticipantRepository::get(tx, challenge_id, user)?
                .ok_or_else(|| DomainError::permission_denied("not a participant of this challenge"))?;
            let _ = find_task(tx, challenge_id, task_id)?;
            let row = ParticipantRepository::task(tx, &participant.id, task_id)?
                .ok_or_else(|| DomainError::not_found("participant task"))?;

            let completed = !row.completed;
            ParticipantRepository::set_completed(tx, &row.id, completed, &format_timestamp(now))?;
            info!(user_id = %user, challenge_id, task_id, completed, "challenge task toggled");
            ParticipantRepository::task(tx, &participant.id, task_id)?
                .ok_or_else(|| DomainError::not_found("participant task"))
        })
    }
}

fn find_task(conn: &Connection, challenge_id: &str, id: &str) -> Result<ChallengeTask> {
    ChallengeTaskRepository::get(conn, challenge_id, id)?.ok_or_else(|| DomainError::not_found("challenge task"))
}

#[cfg(test)]
#[allow(unused_results)]
mod tests {
    use super::*;
    use crate::service::ChallengeService;
    use crate::testing::{add_member, at, seed_challenge, seed_community, setup_db};
    use assert_matches::assert_matches;

    fn task(description: &str) -> ChallengeTaskParams {
        ChallengeTaskParams {
            description: description.into(),
        }
    }

    fn row_count(conn: &Connection, challenge: &str) -> i64 {
        conn.query_row(
            "SELECT COUNT(*) FROM challenge_participant_tasks pt
             JOIN challenge_participants p ON p.id = pt.participant_id
             WHERE p.challenge_id = ?1",
            [challenge],
            |r| r.get(0),
        )
        .unwrap()
    }

    #[test]
    fn failed_fan_out_rolls_back_the_new_task() {
        let conn = setup_db();
        let community = seed_community(&conn, "owner", "public");
        let challenge = seed_challenge(&conn, &community, "owner");
        add_member(&conn, &community, "alice", "member");
        add_member(&conn, &community, "bob", "member");
        let owner = UserId::from("owner");
        let now = at(2026, 6, 10);
        ChallengeService::join(&conn, &UserId::from("alice"), &community, &challenge, now).unwrap();
        ChallengeService::join(&conn, &UserId::from("bob"), &community, &challenge, now).unwrap();

        // The first checklist row of a new task lands, the second one fails.
        conn.execute_batch(
            "CREATE TEMP TRIGGER second_checklist_row_fails
             BEFORE INSERT ON challenge_participant_tasks
             WHEN (SELECT COUNT(*) FROM challenge_participant_tasks WHERE task_id = NEW.task_id) > 0
             BEGIN SELECT RAISE(ABORT, 'write failed'); END;",
        )
        .unwrap();

        let err = ChallengeTaskService::store(&conn, &owner, &community, &challenge, &task("run")).unwrap_err();
        assert_matches!(err, DomainError::Sqlite(_));
        let tasks: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM challenge_tasks WHERE challenge_id = ?1",
                [&challenge],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(tasks, 0);
        assert_eq!(row_count(&conn, &challenge), 0);
    }

    #[test]
    fn every_participant_gets_every_task_in_either_order() {
        let conn = setup_db();
        let community = seed_community(&conn, "owner", "public");
        let challenge = seed_challenge(&conn, &community, "owner");
        add_member(&conn, &community, "alice", "member");
        add_member(&conn, &community, "bob", "member");
        let owner = UserId::from("owner");
        let now = at(2026, 6, 10);

        ChallengeTaskService::store(&conn, &owner, &community, &challenge, &task("stretch")).unwrap();
        ChallengeService::join(&conn, &UserId::from("alice"), &community, &challenge, now).unwrap();
        ChallengeTaskService::store(&conn, &owner, &community, &challenge, &task("run")).unwrap();
        ChallengeService::join(&conn, &UserId::from("bob"), &community, &challenge, now).unwrap();
        ChallengeTaskService::store(&conn, &owner, &community, &challenge, &task("rest")).unwrap();

        assert_eq!(row_count(&conn, &challenge), 2 * 3);
        let duplicates: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM (SELECT participant_id, task_id FROM challenge_participant_tasks
                 GROUP BY participant_id, task_id HAVING COUNT(*) > 1)",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(duplicates, 0);
    }

    #[test]
    fn deleting_a_task_drops_its_rows() {
        let conn = setup_db();
        let community = seed_community(&conn, "owner", "public");
        let challenge = seed_challenge(&conn, &community, "owner");
        let owner = UserId::from("owner");
        let t = ChallengeTaskService::store(&conn, &owner, &community, &challenge, &task("run")).unwrap();
        ChallengeService::join(&conn, &owner, &community, &challenge, at(2026, 6, 10)).unwrap();
        assert_eq!(row_count(&conn, &challenge), 1);

        ChallengeTaskService::delete(&conn, &owner, &community, &challenge, &t.id).unwrap();
        assert_eq!(row_count(&conn, &challenge), 0);
        assert_matches!(
            ChallengeTaskService::show(&conn, &owner, &community, &challenge, &t.id),
            Err(DomainError::NotFound { .. })
        );
    }

    #[test]
    fn closed_challenges_take_no_new_tasks() {
        let conn = setup_db();
        let community = seed_community(&conn, "owner", "public");
        let challenge = seed_challenge(&conn, &community, "owner");
        conn.execute("UPDATE challenges SET status = 'closed' WHERE id = ?1", [&challenge])
            .unwrap();
        assert_matches!(
            ChallengeTaskService::store(&conn, &UserId::from("owner"), &community, &challenge, &task("run")),
            Err(DomainError::InvalidStateTransition(_))
        );
    }

    #[test]
    fn members_read_but_do_not_manage_tasks() {
        let conn = setup_db();
        let community = seed_community(&conn, "owner", "public");
        let challenge = seed_challenge(&conn, &community, "owner");
        add_member(&conn, &community, "bob", "member");
        let owner = UserId::from("owner");
        let bob = UserId::from("bob");
        let t = ChallengeTaskService::store(&conn, &owner, &community, &challenge, &task("run")).unwrap();

        assert_eq!(ChallengeTaskService::list(&conn, &bob, &community, &challenge).unwrap().len(), 1);
        assert_matches!(
            ChallengeTaskService::update(&conn, &bob, &community, &challenge, &t.id, &task("walk")),
            Err(DomainError::PermissionDenied(_))
        );
        assert_matches!(
            ChallengeTaskService::list(&conn, &UserId::from("stranger"), &community, &challenge),
            Err(DomainError::PermissionDenied(_))
        );
        let renamed = ChallengeTaskService::update(&conn, &owner, &community, &challenge, &t.id, &task("walk")).unwrap();
        assert_eq!(renamed.description, "walk");
    }

    #[test]
    fn toggle_flips_and_tracks_completion_time() {
        let conn = setup_db();
        let community = seed_community(&conn, "owner", "public");
        let challenge = seed_challenge(&conn, &community, "owner");
        add_member(&conn, &community, "alice", "member");
        let owner = UserId::from("owner");
        let alice = UserId::from("alice");
        let t = ChallengeTaskService::store(&conn, &owner, &community, &challenge, &task("run")).unwrap();

        assert_matches!(
            ChallengeTaskService::toggle(&conn, &alice, &community, &challenge, &t.id, at(2026, 6, 10)),
            Err(DomainError::PermissionDenied(_))
        );
        ChallengeService::join(&conn, &alice, &community, &challenge, at(2026, 6, 10)).unwrap();

        let done = ChallengeTaskService::toggle(&conn, &alice, &community, &challenge, &t.id, at(2026, 6, 11)).unwrap();
        assert!(done.completed);
        assert_eq!(done.completed_at.as_deref(), Some("2026-06-11T12:00:00Z"));

        let undone =
            ChallengeTaskService::toggle(&conn, &alice, &community, &challenge, &t.id, at(2026, 6, 12)).unwrap();
        assert!(!undone.completed);
        assert_eq!(undone.completed_at, None);

        assert_matches!(
            ChallengeTaskService::toggle(&conn, &alice, &community, &challenge, "missing", at(2026, 6, 12)),
            Err(DomainError::NotFound { .. })
        );
    }
}
