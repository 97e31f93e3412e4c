use rusqlite::Connection;
use tracing::debug;

use waypoint_core::{Result, UserId};

use super::{find_challenge, find_community, require_member};
use crate::progress::{percent, rank};
use crate::repository::{ChallengeTaskRepository, ProgressRepository};
use crate::types::{ChallengeProgress, CommunityProgress, RankingEntry, UserChallengeTask};

/// Read-only completion reports. Every report except the caller's own task
/// view is limited to community members.
pub struct ProgressService;

impl ProgressService {
    /// Each participant's share of the challenge's tasks, highest first.
    pub fn challenge(
        conn: &Connection,
        user: &UserId,
        community_id: &str,
        challenge_id: &str,
    ) -> Result<ChallengeProgress> {
        let _ = find_community(conn, community_id)?;
        let _ = require_member(conn, community_id, user)?;
        let challenge = find_challenge(conn, community_id, challenge_id)?;
        let total = ChallengeTaskRepository::count(conn, challenge_id)?;

        let mut participants = ProgressRepository::participant_counts(conn, challenge_id, total)?;
        for p in &mut participants {
            p.progress = percent(p.completed_tasks, p.total_tasks);
        }
        participants.sort_by(|a, b| b.progress.total_cmp(&a.progress).then_with(|| a.user_id.cmp(&b.user_id)));

        Ok(ChallengeProgress {
            challenge_id: challenge.id,
            challenge_title: challenge.title,
            participants,
        })
    }

    /// Per-challenge and overall completion of a community. The overall
    /// figure is one ratio over all rows, so bigger challenges weigh more.
    pub fn community(conn: &Connection, user: &UserId, community_id: &str) -> Result<CommunityProgress> {
        let _ = find_community(conn, community_id)?;
        let _ = require_member(conn, community_id, user)?;

        let mut challenges = ProgressRepository::challenge_totals(conn, community_id)?;
        let (mut completed, mut possible) = (0, 0);
        for c in &mut challenges {
            let slots = c.task_count * c.participant_count;
            c.progress = percent(c.completed_tasks, slots);
            completed += c.completed_tasks;
            possible += slots;
        }
        debug!(community_id, completed, possible, "community progress computed");

        Ok(CommunityProgress {
            community_id: community_id.to_string(),
            overall_progress: percent(completed, possible),
            challenges,
        })
    }

    /// Users ranked by completed rows across all of the community's
    /// challenges, ties going to whoever finished their last task first.
    pub fn ranking(conn: &Connection, user: &UserId, community_id: &str) -> Result<Vec<RankingEntry>> {
        let _ = find_community(conn, community_id)?;
        let _ = require_member(conn, community_id, user)?;
        Ok(rank(ProgressRepository::ranking_inputs(conn, community_id)?))
    }

    /// Every challenge task assigned to the caller.
    pub fn user_tasks(conn: &Connection, user: &UserId) -> Result<Vec<UserChallengeTask>> {
        ProgressRepository::user_tasks(conn, user)
    }
}
