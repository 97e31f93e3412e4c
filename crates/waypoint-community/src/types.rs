//! Community records, request parameters, and progress reports.
//!
//! Status and role columns are stored as lowercase text; the enums below map
//! them both ways. Everything the HTTP layer returns serializes with
//! snake_case field names.

use serde::{Deserialize, Serialize};

macro_rules! sql_enum {
    (@first $first:ident $($rest:ident)*) => {
        Self::$first
    };
    ($(#[$meta:meta])* $name:ident { $($(#[$vmeta:meta])* $variant:ident => $sql:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "lowercase")]
        pub enum $name {
            $($(#[$vmeta])* $variant,)+
        }

        impl $name {
            /// SQL column value.
            pub fn as_sql(self) -> &'static str {
                match self {
                    $(Self::$variant => $sql,)+
                }
            }

            /// Parse the SQL column value. Unknown values fall back to the
            /// first variant; the schema's CHECK constraints keep them out.
            pub fn from_sql(value: &str) -> Self {
                match value {
                    $($sql => Self::$variant,)+
                    _ => sql_enum!(@first $($variant)+),
                }
            }
        }
    };
}

sql_enum! {
    /// Who may join a community directly.
    Visibility {
        /// Anyone joins immediately.
        Public => "public",
        /// Joining goes through an approved request.
        Private => "private",
    }
}

sql_enum! {
    /// Lifecycle of a community or a challenge.
    Status {
        /// Open for activity.
        Active => "active",
        /// Closed by its owner or an admin.
        Closed => "closed",
    }
}

sql_enum! {
    /// Authority inside a community: `creator > admin > member`.
    MemberRole {
        /// Plain member.
        Member => "member",
        /// Manages members, requests, and challenges.
        Admin => "admin",
        /// The founding owner. Can never leave or be removed.
        Creator => "creator",
    }
}

impl MemberRole {
    /// Whether this role may manage members and challenges.
    pub fn can_manage(self) -> bool {
        matches!(self, Self::Admin | Self::Creator)
    }
}

sql_enum! {
    /// State of a private-community join request.
    RequestStatus {
        /// Waiting for an admin.
        Pending => "pending",
        /// Accepted; the user is a member.
        Approved => "approved",
        /// Declined; the user may ask again.
        Rejected => "rejected",
    }
}

sql_enum! {
    /// Role of a challenge participant.
    ParticipantRole {
        /// Regular participant.
        Participant => "participant",
        /// The user who created the challenge. Cannot leave it.
        Creator => "creator",
    }
}

/// Where a challenge sits relative to its scheduling window.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeStatus {
    /// Closed regardless of dates.
    Closed,
    /// Starts in the future.
    Upcoming,
    /// End date has passed.
    Finished,
    /// Inside the window.
    Ongoing,
}

// ─────────────────────────────────────────────────────────────────────────────
// Communities
// ─────────────────────────────────────────────────────────────────────────────

/// A community with its aggregate fields.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Community {
    /// Unique ID.
    pub id: String,
    /// Owning user (also the `creator` member).
    pub owner_id: String,
    /// Life area the community is about.
    pub life_area_id: Option<String>,
    /// Life area display name.
    pub life_area_designation: Option<String>,
    /// Display name.
    pub designation: String,
    /// Free text.
    pub description: String,
    /// Shared objective.
    pub objective: String,
    /// Group chat invite.
    pub whatsapp_link: Option<String>,
    /// Join policy.
    pub visibility: Visibility,
    /// Lifecycle state.
    pub status: Status,
    /// Number of members.
    pub member_count: i64,
    /// Creation timestamp.
    pub created_at: String,
    /// Last update timestamp.
    pub updated_at: String,
}

/// A community together with its members.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CommunityDetail {
    /// The community.
    #[serde(flatten)]
    pub community: Community,
    /// Members, oldest first.
    pub members: Vec<Member>,
}

/// Membership of a user in a community.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Member {
    /// Unique ID.
    pub id: String,
    /// Community.
    pub community_id: String,
    /// Member user.
    pub user_id: String,
    /// Authority level.
    pub role: MemberRole,
    /// When the user joined.
    pub joined_at: String,
}

/// A request to join a private community.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct JoinRequest {
    /// Unique ID.
    pub id: String,
    /// Community.
    pub community_id: String,
    /// Requesting user.
    pub user_id: String,
    /// Current state.
    pub status: RequestStatus,
    /// Admin who approved or rejected.
    pub handled_by: Option<String>,
    /// When it was approved or rejected.
    pub handled_at: Option<String>,
    /// Creation timestamp.
    pub created_at: String,
    /// Last update timestamp.
    pub updated_at: String,
}

/// Result of asking to join a community.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "record", rename_all = "snake_case")]
pub enum JoinOutcome {
    /// Public community: the user is now a member.
    Joined(Member),
    /// Private community: a request is waiting for approval.
    Requested(JoinRequest),
}

/// Create a community.
#[derive(Clone, Debug, Deserialize)]
pub struct CommunityParams {
    /// Life area (default or owned by the creator).
    pub life_area_id: String,
    /// Display name.
    pub designation: String,
    /// Free text.
    pub description: String,
    /// Shared objective.
    pub objective: String,
    /// Join policy.
    pub visibility: Visibility,
    /// Group chat invite.
    #[serde(default)]
    pub whatsapp_link: Option<String>,
}

/// Partial community update.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct CommunityPatch {
    /// New life area.
    pub life_area_id: Option<String>,
    /// New display name.
    pub designation: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// New objective.
    pub objective: Option<String>,
    /// New join policy.
    pub visibility: Option<Visibility>,
    /// Set or clear the chat invite.
    #[serde(default, deserialize_with = "waypoint_core::nullable::deserialize")]
    pub whatsapp_link: Option<Option<String>>,
}

/// Filters for community listings.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct CommunityFilter {
    /// Exact life area.
    pub life_area_id: Option<String>,
    /// Substring of the objective.
    pub objective: Option<String>,
    /// Substring of the life area name.
    pub category: Option<String>,
    /// Free-text search over name, description, objective, and life area.
    pub q: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Challenges
// ─────────────────────────────────────────────────────────────────────────────

/// A time-boxed challenge inside a community.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Challenge {
    /// Unique ID.
    pub id: String,
    /// Owning community.
    pub community_id: String,
    /// User who created it.
    pub created_by: String,
    /// Title.
    pub title: String,
    /// Free text.
    pub description: Option<String>,
    /// Window start.
    pub start_at: String,
    /// Window end; open-ended when absent.
    pub end_at: Option<String>,
    /// Lifecycle state.
    pub status: Status,
    /// Creation timestamp.
    pub created_at: String,
    /// Last update timestamp.
    pub updated_at: String,
}

/// A challenge as listed, with participation and timing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ChallengeView {
    /// The challenge.
    #[serde(flatten)]
    pub challenge: Challenge,
    /// Number of participants.
    pub participant_count: i64,
    /// Position relative to the window.
    pub time_status: TimeStatus,
}

/// Create a challenge.
#[derive(Clone, Debug, Deserialize)]
pub struct ChallengeParams {
    /// Title.
    pub title: String,
    /// Free text.
    #[serde(default)]
    pub description: Option<String>,
    /// Window start.
    pub start_at: String,
    /// Window end.
    #[serde(default)]
    pub end_at: Option<String>,
}

/// Partial challenge update.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ChallengePatch {
    /// New title.
    pub title: Option<String>,
    /// Set or clear the description.
    #[serde(default, deserialize_with = "waypoint_core::nullable::deserialize")]
    pub description: Option<Option<String>>,
    /// New window start.
    pub start_at: Option<String>,
    /// Set or clear the window end.
    #[serde(default, deserialize_with = "waypoint_core::nullable::deserialize")]
    pub end_at: Option<Option<String>>,
    /// New lifecycle state.
    pub status: Option<Status>,
}

/// A template task of a challenge.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ChallengeTask {
    /// Unique ID.
    pub id: String,
    /// Owning challenge.
    pub challenge_id: String,
    /// Task text.
    pub description: String,
    /// Creation timestamp.
    pub created_at: String,
    /// Last update timestamp.
    pub updated_at: String,
}

/// Create or edit a challenge task.
#[derive(Clone, Debug, Deserialize)]
pub struct ChallengeTaskParams {
    /// Task text.
    pub description: String,
}

/// A user's participation in a challenge.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Participant {
    /// Unique ID.
    pub id: String,
    /// Challenge.
    pub challenge_id: String,
    /// Participating user.
    pub user_id: String,
    /// Creator or regular participant.
    pub role: ParticipantRole,
    /// When the user joined.
    pub joined_at: String,
}

/// One row of a participant's checklist.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ParticipantTask {
    /// Unique ID.
    pub id: String,
    /// Participation.
    pub participant_id: String,
    /// Challenge task.
    pub task_id: String,
    /// Done flag.
    pub completed: bool,
    /// When it was last marked done.
    pub completed_at: Option<String>,
    /// Creation timestamp.
    pub created_at: String,
    /// Last update timestamp.
    pub updated_at: String,
}

/// A new participation with its checklist.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Joined {
    /// The participation.
    pub participant: Participant,
    /// One unchecked row per challenge task.
    pub tasks: Vec<ParticipantTask>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Progress
// ─────────────────────────────────────────────────────────────────────────────

/// Completion of one participant.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ParticipantProgress {
    /// Participation.
    pub participant_id: String,
    /// Participating user.
    pub user_id: String,
    /// Checked rows.
    pub completed_tasks: i64,
    /// Tasks defined on the challenge.
    pub total_tasks: i64,
    /// Percentage, two decimals.
    pub progress: f64,
}

/// Completion of every participant in one challenge.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChallengeProgress {
    /// Challenge.
    pub challenge_id: String,
    /// Challenge title.
    pub challenge_title: String,
    /// Participants, most progressed first.
    pub participants: Vec<ParticipantProgress>,
}

/// Completion of one challenge across all its participants.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChallengeTotals {
    /// Challenge.
    pub challenge_id: String,
    /// Challenge title.
    pub challenge_title: String,
    /// Tasks defined on the challenge.
    pub task_count: i64,
    /// Participants.
    pub participant_count: i64,
    /// Checked rows across participants.
    pub completed_tasks: i64,
    /// `completed / (tasks * participants)`, two decimals.
    pub progress: f64,
}

/// Completion of a whole community.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CommunityProgress {
    /// Community.
    pub community_id: String,
    /// All completed rows over all possible rows, two decimals.
    pub overall_progress: f64,
    /// Per-challenge breakdown in `start_at` order.
    pub challenges: Vec<ChallengeTotals>,
}

/// One row of a community ranking.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RankingEntry {
    /// 1-based position.
    pub rank: usize,
    /// Ranked user.
    pub user_id: String,
    /// Completed rows across the community's challenges.
    pub completed_tasks: i64,
    /// Latest completion, used to break ties.
    pub last_completed_at: Option<String>,
}

/// A participant task as seen from the user's own task view.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct UserChallengeTask {
    /// Challenge task.
    pub task_id: String,
    /// Task text.
    pub description: String,
    /// Done flag.
    pub completed: bool,
    /// When it was last marked done.
    pub completed_at: Option<String>,
    /// Challenge.
    pub challenge_id: String,
    /// Challenge title.
    pub challenge_title: String,
    /// Community.
    pub community_id: String,
    /// Community name.
    pub community_designation: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sql_values_round_trip() {
        for role in [MemberRole::Member, MemberRole::Admin, MemberRole::Creator] {
            assert_eq!(MemberRole::from_sql(role.as_sql()), role);
        }
        assert_eq!(Status::from_sql("closed"), Status::Closed);
        assert_eq!(Visibility::from_sql("bogus"), Visibility::Public);
    }

    #[test]
    fn only_creator_and_admin_manage() {
        assert!(MemberRole::Creator.can_manage());
        assert!(MemberRole::Admin.can_manage());
        assert!(!MemberRole::Member.can_manage());
    }

    #[test]
    fn join_outcome_is_tagged() {
        let outcome = JoinOutcome::Requested(JoinRequest {
            id: "r".into(),
            community_id: "c".into(),
            user_id: "u".into(),
            status: RequestStatus::Pending,
            handled_by: None,
            handled_at: None,
            created_at: "x".into(),
            updated_at: "x".into(),
        });
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["outcome"], "requested");
        assert_eq!(json["record"]["status"], "pending");
    }
}
