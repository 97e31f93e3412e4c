use std::sync::LazyLock;

use regex::Regex;
use rusqlite::Connection;
use tracing::{debug, info};

use waypoint_core::{DomainError, Result, UserId, generate_id};
use waypoint_planner::repository::HierarchyRepository;
use waypoint_store::immediate;

use super::{find_community, require_text};
use crate::repository::{CommunityRepository, MemberRepository};
use crate::types::{
    Community, CommunityDetail, CommunityFilter, CommunityParams, CommunityPatch, MemberRole, Status,
};

const DESIGNATION_MAX: usize = 255;
const LINK_MAX: usize = 255;

static DESIGNATION_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9\s\-._]+$").expect("valid designation regex"));
static WHATSAPP_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https?://(chat\.whatsapp\.com|wa\.me)/.+$").expect("valid whatsapp regex"));

/// Community lifecycle and discovery.
pub struct CommunityService;

impl CommunityService {
    /// Active communities matching `filter`, newest first.
    pub fn list(conn: &Connection, filter: &CommunityFilter) -> Result<Vec<Community>> {
        let communities = CommunityRepository::list(conn, filter, None)?;
        debug!(count = communities.len(), "communities listed");
        Ok(communities)
    }

    /// Active communities the user belongs to.
    pub fn mine(conn: &Connection, user: &UserId, filter: &CommunityFilter) -> Result<Vec<Community>> {
        CommunityRepository::list(conn, filter, Some(user))
    }

    /// A community with its members.
    pub fn show(conn: &Connection, id: &str) -> Result<CommunityDetail> {
        let community = find_community(conn, id)?;
        let members = MemberRepository::list(conn, id)?;
        Ok(CommunityDetail { community, members })
    }

    /// Create a community; the caller becomes its `creator` member.
    pub fn store(conn: &Connection, user: &UserId, params: &CommunityParams) -> Result<Community> {
        check_designation(&params.designation)?;
        require_text("description", &params.description, usize::MAX)?;
        require_text("objective", &params.objective, usize::MAX)?;
        check_link(params.whatsapp_link.as_deref())?;
        immediate(conn, |tx| {
            require_life_area(tx, user, &params.life_area_id)?;
            let id = generate_id("community");
            CommunityRepository::insert(tx, &id, user, params)?;
            MemberRepository::insert(tx, &id, user, MemberRole::Creator)?;
            info!(user_id = %user, community_id = %id, visibility = params.visibility.as_sql(), "community created");
            find_community(tx, &id)
        })
    }

    /// Owner-only partial update.
    pub fn update(conn: &Connection, user: &UserId, id: &str, patch: &CommunityPatch) -> Result<Community> {
        if let Some(ref designation) = patch.designation {
            check_designation(designation)?;
        }
        if let Some(ref description) = patch.description {
            require_text("description", description, usize::MAX)?;
        }
        if let Some(ref objective) = patch.objective {
            require_text("objective", objective, usize::MAX)?;
        }
        if let Some(ref link) = patch.whatsapp_link {
            check_link(link.as_deref())?;
        }
        immediate(conn, |tx| {
            let community = find_community(tx, id)?;
            require_owner(&community, user, "edit")?;
            if let Some(ref area) = patch.life_area_id {
                require_life_area(tx, user, area)?;
            }
            let _ = CommunityRepository::update(tx, id, patch)?;
            find_community(tx, id)
        })
    }

    /// Owner-only `active → closed`.
    pub fn close(conn: &Connection, user: &UserId, id: &str) -> Result<Community> {
        Self::transition(conn, user, id, Status::Active, Status::Closed)
    }

    /// Owner-only `closed → active`.
    pub fn reopen(conn: &Connection, user: &UserId, id: &str) -> Result<Community> {
        Self::transition(conn, user, id, Status::Closed, Status::Active)
    }

    fn transition(conn: &Connection, user: &UserId, id: &str, from: Status, to: Status) -> Result<Community> {
        immediate(conn, |tx| {
            let community = find_community(tx, id)?;
            require_owner(&community, user, "change the status of")?;
            if community.status != from {
                return Err(DomainError::invalid_state(format!(
                    "community is already {}",
                    community.status.as_sql()
                )));
            }
            CommunityRepository::set_status(tx, id, to)?;
            info!(user_id = %user, community_id = %id, status = to.as_sql(), "community status changed");
            find_community(tx, id)
        })
    }
}

fn require_owner(community: &Community, user: &str, action: &str) -> Result<()> {
    if community.owner_id != user {
        return Err(DomainError::permission_denied(format!(
            "only the owner can {action} this community"
        )));
    }
    Ok(())
}

fn require_life_area(conn: &Connection, user: &str, id: &str) -> Result<()> {
    if !HierarchyRepository::life_area_visible(conn, user, id)? {
        return Err(DomainError::permission_denied("life area is not available to this user"));
    }
    Ok(())
}

fn check_designation(value: &str) -> Result<()> {
    require_text("designation", value, DESIGNATION_MAX)?;
    if !DESIGNATION_PATTERN.is_match(value) {
        return Err(DomainError::validation("designation contains invalid characters"));
    }
    Ok(())
}

fn check_link(value: Option<&str>) -> Result<()> {
    let Some(link) = value else {
        return Ok(());
    };
    if link.chars().count() > LINK_MAX || !WHATSAPP_PATTERN.is_match(link) {
        return Err(DomainError::validation("whatsapp_link must be a chat.whatsapp.com or wa.me link"));
    }
    Ok(())
}
