//! SQL data access for communities and challenges.
//!
//! Stateless functions over a `&Connection`. Role and membership checks live
//! in the services; these functions only scope rows by community or
//! challenge.

mod challenges;
mod communities;
mod members;
mod participants;

pub use challenges::{ChallengeRepository, ChallengeTaskRepository};
pub use communities::CommunityRepository;
pub use members::{JoinRequestRepository, MemberRepository};
pub use participants::{ParticipantRepository, ProgressRepository};
