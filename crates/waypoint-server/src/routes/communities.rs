use axum::Router;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use serde_json::Value;
use tracing::instrument;

use waypoint_community::types::{
    Community, CommunityDetail, CommunityFilter, CommunityParams, CommunityPatch, JoinOutcome, JoinRequest, Member,
};
use waypoint_community::{CommunityService, MembershipService};

use super::Bare;
use crate::envelope::{ApiResponse, ApiResult};
use crate::identity::{Actor, Filter, Payload};
use crate::server::AppState;

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/communities", get(index).post(store))
        .route("/communities/mine", get(mine))
        .route("/communities/{id}", get(show).put(update))
        .route("/communities/{id}/close", post(close))
        .route("/communities/{id}/reopen", post(reopen))
        .route("/communities/{id}/join", post(join))
        .route("/communities/{id}/leave", post(leave))
        .route("/communities/{id}/join_requests", get(join_requests))
        .route("/communities/{id}/join_requests/{request_id}/approve", post(approve))
        .route("/communities/{id}/join_requests/{request_id}/reject", post(reject))
        .route("/communities/{id}/members/{user_id}/remove", post(remove_member))
        .route("/communities/{id}/members/{user_id}/promote", post(promote_member))
}

// ─────────────────────────────────────────────────────────────────────────────
// Communities
// ─────────────────────────────────────────────────────────────────────────────

/// Browsing is open to any identified user.
#[instrument(skip_all, fields(user_id = %user))]
async fn index(
    State(state): State<AppState>,
    Actor(user): Actor,
    Filter(filter): Filter<CommunityFilter>,
) -> ApiResult<Vec<Community>> {
    let data = state.run(move |conn| CommunityService::list(conn, &filter)).await?;
    Ok(ApiResponse::ok(data))
}

#[instrument(skip_all, fields(user_id = %user))]
async fn mine(
    State(state): State<AppState>,
    Actor(user): Actor,
    Filter(filter): Filter<CommunityFilter>,
) -> ApiResult<Vec<Community>> {
    let data = state.run(move |conn| CommunityService::mine(conn, &user, &filter)).await?;
    Ok(ApiResponse::ok(data))
}

#[instrument(skip_all, fields(user_id = %user, id = %id))]
async fn show(State(state): State<AppState>, Actor(user): Actor, Path(id): Path<String>) -> ApiResult<CommunityDetail> {
    let data = state.run(move |conn| CommunityService::show(conn, &id)).await?;
    Ok(ApiResponse::ok(data))
}

#[instrument(skip_all, fields(user_id = %req.actor))]
async fn store(State(state): State<AppState>, req: Payload<CommunityParams>) -> ApiResult<Community> {
    let data = state
        .run(move |conn| CommunityService::store(conn, &req.actor, &req.body))
        .await?;
    Ok(ApiResponse::created(data).with_message("community created"))
}

#[instrument(skip_all, fields(user_id = %req.actor, id = %id))]
async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    req: Payload<CommunityPatch>,
) -> ApiResult<Community> {
    let data = state
        .run(move |conn| CommunityService::update(conn, &req.actor, &id, &req.body))
        .await?;
    Ok(ApiResponse::ok(data).with_message("community updated"))
}

#[instrument(skip_all, fields(user_id = %req.actor, id = %id))]
async fn close(State(state): State<AppState>, Path(id): Path<String>, req: Bare) -> ApiResult<Community> {
    let data = state.run(move |conn| CommunityService::close(conn, &req.actor, &id)).await?;
    Ok(ApiResponse::ok(data).with_message("community closed"))
}

#[instrument(skip_all, fields(user_id = %req.actor, id = %id))]
async fn reopen(State(state): State<AppState>, Path(id): Path<String>, req: Bare) -> ApiResult<Community> {
    let data = state.run(move |conn| CommunityService::reopen(conn, &req.actor, &id)).await?;
    Ok(ApiResponse::ok(data).with_message("community reopened"))
}

// ─────────────────────────────────────────────────────────────────────────────
// Membership
// ─────────────────────────────────────────────────────────────────────────────

#[instrument(skip_all, fields(user_id = %req.actor, id = %id))]
async fn join(State(state): State<AppState>, Path(id): Path<String>, req: Bare) -> ApiResult<JoinOutcome> {
    let outcome = state.run(move |conn| MembershipService::join(conn, &req.actor, &id)).await?;
    let response = match outcome {
        JoinOutcome::Joined(_) => ApiResponse::created(outcome).with_message("joined community"),
        JoinOutcome::Requested(_) => ApiResponse::ok(outcome).with_message("join request sent"),
    };
    Ok(response)
}

#[instrument(skip_all, fields(user_id = %req.actor, id = %id))]
async fn leave(State(state): State<AppState>, Path(id): Path<String>, req: Bare) -> ApiResult<Value> {
    state.run(move |conn| MembershipService::leave(conn, &req.actor, &id)).await?;
    Ok(ApiResponse::ok(Value::Null).with_message("left community"))
}

#[instrument(skip_all, fields(user_id = %user, id = %id))]
async fn join_requests(
    State(state): State<AppState>,
    Actor(user): Actor,
    Path(id): Path<String>,
) -> ApiResult<Vec<JoinRequest>> {
    let data = state
        .run(move |conn| MembershipService::join_requests(conn, &user, &id))
        .await?;
    Ok(ApiResponse::ok(data))
}

#[instrument(skip_all, fields(user_id = %req.actor, id = %id, request_id = %request_id))]
async fn approve(
    State(state): State<AppState>,
    Path((id, request_id)): Path<(String, String)>,
    req: Bare,
) -> ApiResult<JoinRequest> {
    let data = state
        .run(move |conn| MembershipService::approve(conn, &req.actor, &id, &request_id))
        .await?;
    Ok(ApiResponse::ok(data).with_message("join request approved"))
}

#[instrument(skip_all, fields(user_id = %req.actor, id = %id, request_id = %request_id))]
async fn reject(
    State(state): State<AppState>,
    Path((id, request_id)): Path<(String, String)>,
    req: Bare,
) -> ApiResult<JoinRequest> {
    let data = state
        .run(move |conn| MembershipService::reject(conn, &req.actor, &id, &request_id))
        .await?;
    Ok(ApiResponse::ok(data).with_message("join request rejected"))
}

#[instrument(skip_all, fields(user_id = %req.actor, id = %id, member = %member))]
async fn remove_member(
    State(state): State<AppState>,
    Path((id, member)): Path<(String, String)>,
    req: Bare,
) -> ApiResult<Value> {
    state
        .run(move |conn| MembershipService::remove(conn, &req.actor, &id, &member))
        .await?;
    Ok(ApiResponse::ok(Value::Null).with_message("member removed"))
}

#[instrument(skip_all, fields(user_id = %req.actor, id = %id, member = %member))]
async fn promote_member(
    State(state): State<AppState>,
    Path((id, member)): Path<(String, String)>,
    req: Bare,
) -> ApiResult<Member> {
    let data = state
        .run(move |conn| MembershipService::promote(conn, &req.actor, &id, &member))
        .await?;
    Ok(ApiResponse::ok(data).with_message("member promoted"))
}
