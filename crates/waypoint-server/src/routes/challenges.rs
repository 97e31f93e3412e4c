use axum::Router;
use axum::extract::{Path, State};
use axum::routing::{delete, get, post, put};
use chrono::Utc;
use serde_json::Value;
use tracing::instrument;

use waypoint_community::types::{
    ChallengeParams, ChallengePatch, ChallengeProgress, ChallengeTask, ChallengeTaskParams, ChallengeView,
    CommunityProgress, Joined, ParticipantTask, RankingEntry, UserChallengeTask,
};
use waypoint_community::{ChallengeService, ChallengeTaskService, ProgressService};

use super::{Bare, removed};
use crate::envelope::{ApiResponse, ApiResult};
use crate::identity::{Actor, Payload};
use crate::server::AppState;

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/communities/{id}/challenges", get(index).post(store))
        .route("/communities/{id}/challenges/{challenge_id}", get(show).put(update))
        .route("/communities/{id}/challenges/{challenge_id}/close", post(close))
        .route("/communities/{id}/challenges/{challenge_id}/join", post(join))
        .route("/communities/{id}/challenges/{challenge_id}/leave", delete(leave))
        .route("/communities/{id}/challenges/{challenge_id}/tasks", get(tasks).post(store_task))
        .route(
            "/communities/{id}/challenges/{challenge_id}/tasks/{task_id}",
            get(task).put(update_task).delete(delete_task),
        )
        .route("/communities/{id}/challenges/{challenge_id}/tasks/{task_id}/toggle", put(toggle_task))
        .route("/communities/{id}/challenges/{challenge_id}/progress", get(challenge_progress))
        .route("/communities/{id}/progress", get(community_progress))
        .route("/communities/{id}/ranking", get(ranking))
        .route("/me/challenge_tasks", get(my_tasks))
}

// ─────────────────────────────────────────────────────────────────────────────
// Challenges
// ─────────────────────────────────────────────────────────────────────────────

#[instrument(skip_all, fields(user_id = %user, community_id = %cid))]
async fn index(State(state): State<AppState>, Actor(user): Actor, Path(cid): Path<String>) -> ApiResult<Vec<ChallengeView>> {
    let data = state
        .run(move |conn| ChallengeService::list(conn, &cid, Utc::now()))
        .await?;
    Ok(ApiResponse::ok(data))
}

#[instrument(skip_all, fields(user_id = %user, community_id = %cid, id = %id))]
async fn show(
    State(state): State<AppState>,
    Actor(user): Actor,
    Path((cid, id)): Path<(String, String)>,
) -> ApiResult<ChallengeView> {
    let data = state
        .run(move |conn| ChallengeService::show(conn, &user, &cid, &id, Utc::now()))
        .await?;
    Ok(ApiResponse::ok(data))
}

#[instrument(skip_all, fields(user_id = %req.actor, community_id = %cid))]
async fn store(
    State(state): State<AppState>,
    Path(cid): Path<String>,
    req: Payload<ChallengeParams>,
) -> ApiResult<ChallengeView> {
    let data = state
        .run(move |conn| ChallengeService::store(conn, &req.actor, &cid, &req.body, Utc::now()))
        .await?;
    Ok(ApiResponse::created(data).with_message("challenge created"))
}

#[instrument(skip_all, fields(user_id = %req.actor, community_id = %cid, id = %id))]
async fn update(
    State(state): State<AppState>,
    Path((cid, id)): Path<(String, String)>,
    req: Payload<ChallengePatch>,
) -> ApiResult<ChallengeView> {
    let data = state
        .run(move |conn| ChallengeService::update(conn, &req.actor, &cid, &id, &req.body, Utc::now()))
        .await?;
    Ok(ApiResponse::ok(data).with_message("challenge updated"))
}

#[instrument(skip_all, fields(user_id = %req.actor, community_id = %cid, id = %id))]
async fn close(State(state): State<AppState>, Path((cid, id)): Path<(String, String)>, req: Bare) -> ApiResult<ChallengeView> {
    let data = state
        .run(move |conn| ChallengeService::close(conn, &req.actor, &cid, &id, Utc::now()))
        .await?;
    Ok(ApiResponse::ok(data).with_message("challenge closed"))
}

#[instrument(skip_all, fields(user_id = %req.actor, community_id = %cid, id = %id))]
async fn join(State(state): State<AppState>, Path((cid, id)): Path<(String, String)>, req: Bare) -> ApiResult<Joined> {
    let data = state
        .run(move |conn| ChallengeService::join(conn, &req.actor, &cid, &id, Utc::now()))
        .await?;
    Ok(ApiResponse::created(data).with_message("joined challenge"))
}

#[instrument(skip_all, fields(user_id = %user, community_id = %cid, id = %id))]
async fn leave(
    State(state): State<AppState>,
    Actor(user): Actor,
    Path((cid, id)): Path<(String, String)>,
) -> ApiResult<Value> {
    state
        .run(move |conn| ChallengeService::leave(conn, &user, &cid, &id))
        .await?;
    Ok(ApiResponse::ok(Value::Null).with_message("left challenge"))
}

// ─────────────────────────────────────────────────────────────────────────────
// Challenge tasks
// ─────────────────────────────────────────────────────────────────────────────

#[instrument(skip_all, fields(user_id = %user, challenge_id = %id))]
async fn tasks(
    State(state): State<AppState>,
    Actor(user): Actor,
    Path((cid, id)): Path<(String, String)>,
) -> ApiResult<Vec<ChallengeTask>> {
    let data = state
        .run(move |conn| ChallengeTaskService::list(conn, &user, &cid, &id))
        .await?;
    Ok(ApiResponse::ok(data))
}

#[instrument(skip_all, fields(user_id = %user, challenge_id = %id, task_id = %task_id))]
async fn task(
    State(state): State<AppState>,
    Actor(user): Actor,
    Path((cid, id, task_id)): Path<(String, String, String)>,
) -> ApiResult<ChallengeTask> {
    let data = state
        .run(move |conn| ChallengeTaskService::show(conn, &user, &cid, &id, &task_id))
        .await?;
    Ok(ApiResponse::ok(data))
}

#[instrument(skip_all, fields(user_id = %req.actor, challenge_id = %id))]
async fn store_task(
    State(state): State<AppState>,
    Path((cid, id)): Path<(String, String)>,
    req: Payload<ChallengeTaskParams>,
) -> ApiResult<ChallengeTask> {
    let data = state
        .run(move |conn| ChallengeTaskService::store(conn, &req.actor, &cid, &id, &req.body))
        .await?;
    Ok(ApiResponse::created(data).with_message("challenge task created"))
}

#[instrument(skip_all, fields(user_id = %req.actor, challenge_id = %id, task_id = %task_id))]
async fn update_task(
    State(state): State<AppState>,
    Path((cid, id, task_id)): Path<(String, String, String)>,
    req: Payload<ChallengeTaskParams>,
) -> ApiResult<ChallengeTask> {
    let data = state
        .run(move |conn| ChallengeTaskService::update(conn, &req.actor, &cid, &id, &task_id, &req.body))
        .await?;
    Ok(ApiResponse::ok(data).with_message("challenge task updated"))
}

#[instrument(skip_all, fields(user_id = %user, challenge_id = %id, task_id = %task_id))]
async fn delete_task(
    State(state): State<AppState>,
    Actor(user): Actor,
    Path((cid, id, task_id)): Path<(String, String, String)>,
) -> ApiResult<Value> {
    state
        .run(move |conn| ChallengeTaskService::delete(conn, &user, &cid, &id, &task_id))
        .await?;
    Ok(removed())
}

#[instrument(skip_all, fields(user_id = %req.actor, challenge_id = %id, task_id = %task_id))]
async fn toggle_task(
    State(state): State<AppState>,
    Path((cid, id, task_id)): Path<(String, String, String)>,
    req: Bare,
) -> ApiResult<ParticipantTask> {
    let data = state
        .run(move |conn| ChallengeTaskService::toggle(conn, &req.actor, &cid, &id, &task_id, Utc::now()))
        .await?;
    Ok(ApiResponse::ok(data))
}

// ─────────────────────────────────────────────────────────────────────────────
// Progress
// ─────────────────────────────────────────────────────────────────────────────

#[instrument(skip_all, fields(user_id = %user, challenge_id = %id))]
async fn challenge_progress(
    State(state): State<AppState>,
    Actor(user): Actor,
    Path((cid, id)): Path<(String, String)>,
) -> ApiResult<ChallengeProgress> {
    let data = state
        .run(move |conn| ProgressService::challenge(conn, &user, &cid, &id))
        .await?;
    Ok(ApiResponse::ok(data))
}

#[instrument(skip_all, fields(user_id = %user, community_id = %cid))]
async fn community_progress(
    State(state): State<AppState>,
    Actor(user): Actor,
    Path(cid): Path<String>,
) -> ApiResult<CommunityProgress> {
    let data = state
        .run(move |conn| ProgressService::community(conn, &user, &cid))
        .await?;
    Ok(ApiResponse::ok(data))
}

#[instrument(skip_all, fields(user_id = %user, community_id = %cid))]
async fn ranking(State(state): State<AppState>, Actor(user): Actor, Path(cid): Path<String>) -> ApiResult<Vec<RankingEntry>> {
    let data = state.run(move |conn| ProgressService::ranking(conn, &user, &cid)).await?;
    Ok(ApiResponse::ok(data))
}

#[instrument(skip_all, fields(user_id = %user))]
async fn my_tasks(State(state): State<AppState>, Actor(user): Actor) -> ApiResult<Vec<UserChallengeTask>> {
    let data = state.run(move |conn| ProgressService::user_tasks(conn, &user)).await?;
    Ok(ApiResponse::ok(data))
}
