//! # waypoint-community
//!
//! Group accountability on top of the personal planner:
//!
//! - **Communities** tied to a life area, public (join directly) or private
//!   (join by approved request), with `creator`, `admin`, and `member` roles.
//! - **Challenges**: at most one active per community, each with a time
//!   window derived into `closed`, `upcoming`, `ongoing`, or `finished`.
//! - **Task fan-out**: every participant holds exactly one checklist row per
//!   challenge task, whichever of the two arrived first.
//! - **Progress and ranking** ([`progress`]) computed from those rows.
//!
//! Layout mirrors `waypoint-planner`: stateless repositories over a
//! `&Connection`, services that check roles and wrap each mutation in one
//! immediate transaction.

#![deny(unsafe_code)]

pub mod progress;
pub mod repository;
pub mod schedule;
pub mod service;
pub mod types;

pub use service::{ChallengeService, ChallengeTaskService, CommunityService, MembershipService, ProgressService};
