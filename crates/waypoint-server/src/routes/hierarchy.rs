use axum::Router;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use serde_json::{Value, json};
use tracing::instrument;

use waypoint_planner::types::{
    AnnualGoal, AnnualGoalParams, AnnualGoalPatch, LifeArea, LifeAreaParams, LifeAreaPatch, LongTermVision,
    MonthlyGoal, MonthlyGoalParams, MonthlyGoalPatch, Project, ProjectParams, ProjectPatch, Purpose, PurposeParams,
    PurposePatch, VisionParams, VisionPatch,
};
use waypoint_planner::{HierarchyService, ProjectService};

use super::{Bare, IdsBody, deleted, removed};
use crate::envelope::{ApiResponse, ApiResult};
use crate::identity::{Actor, Payload};
use crate::server::AppState;

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/life_areas", get(life_areas).post(store_life_area))
        .route(
            "/life_areas/{id}",
            get(life_area).put(update_life_area).delete(delete_life_area),
        )
        .route("/purposes", get(purposes).post(store_purpose))
        .route("/purposes/{id}", get(purpose).put(update_purpose).delete(delete_purpose))
        .route("/long_term_visions", get(visions).post(store_vision))
        .route(
            "/long_term_visions/{id}",
            get(vision).put(update_vision).delete(delete_vision),
        )
        .route("/annual_goals", get(annual_goals).post(store_annual_goal))
        .route(
            "/annual_goals/{id}",
            get(annual_goal).put(update_annual_goal).delete(delete_annual_goal),
        )
        .route("/monthly_goals", get(monthly_goals).post(store_monthly_goal))
        .route("/monthly_goals/delete_multiple", post(delete_monthly_goals))
        .route(
            "/monthly_goals/{id}",
            get(monthly_goal).put(update_monthly_goal).delete(delete_monthly_goal),
        )
        .route("/projects", get(projects).post(store_project))
        .route("/projects/archived", get(archived_projects))
        .route("/projects/delete_multiple", post(delete_projects))
        .route("/projects/archive_multiple", post(archive_projects))
        .route("/projects/{id}", get(project).put(update_project).delete(delete_project))
        .route("/projects/{id}/archive", post(archive_project))
}

// ─────────────────────────────────────────────────────────────────────────────
// Life areas
// ─────────────────────────────────────────────────────────────────────────────

#[instrument(skip_all, fields(user_id = %user))]
async fn life_areas(State(state): State<AppState>, Actor(user): Actor) -> ApiResult<Vec<LifeArea>> {
    let data = state.run(move |conn| HierarchyService::list_life_areas(conn, &user)).await?;
    Ok(ApiResponse::ok(data))
}

#[instrument(skip_all, fields(user_id = %user, id = %id))]
async fn life_area(State(state): State<AppState>, Actor(user): Actor, Path(id): Path<String>) -> ApiResult<LifeArea> {
    let data = state.run(move |conn| HierarchyService::get_life_area(conn, &user, &id)).await?;
    Ok(ApiResponse::ok(data))
}

#[instrument(skip_all, fields(user_id = %req.actor))]
async fn store_life_area(State(state): State<AppState>, req: Payload<LifeAreaParams>) -> ApiResult<LifeArea> {
    let data = state
        .run(move |conn| HierarchyService::store_life_area(conn, &req.actor, &req.body))
        .await?;
    Ok(ApiResponse::created(data).with_message("life area saved"))
}

#[instrument(skip_all, fields(user_id = %req.actor, id = %id))]
async fn update_life_area(
    State(state): State<AppState>,
    Path(id): Path<String>,
    req: Payload<LifeAreaPatch>,
) -> ApiResult<LifeArea> {
    let data = state
        .run(move |conn| HierarchyService::update_life_area(conn, &req.actor, &id, &req.body))
        .await?;
    Ok(ApiResponse::ok(data).with_message("life area updated"))
}

#[instrument(skip_all, fields(user_id = %user, id = %id))]
async fn delete_life_area(State(state): State<AppState>, Actor(user): Actor, Path(id): Path<String>) -> ApiResult<Value> {
    state.run(move |conn| HierarchyService::delete_life_area(conn, &user, &id)).await?;
    Ok(removed())
}

// ─────────────────────────────────────────────────────────────────────────────
// Purposes
// ─────────────────────────────────────────────────────────────────────────────

#[instrument(skip_all, fields(user_id = %user))]
async fn purposes(State(state): State<AppState>, Actor(user): Actor) -> ApiResult<Vec<Purpose>> {
    let data = state.run(move |conn| HierarchyService::list_purposes(conn, &user)).await?;
    Ok(ApiResponse::ok(data))
}

#[instrument(skip_all, fields(user_id = %user, id = %id))]
async fn purpose(State(state): State<AppState>, Actor(user): Actor, Path(id): Path<String>) -> ApiResult<Purpose> {
    let data = state.run(move |conn| HierarchyService::get_purpose(conn, &user, &id)).await?;
    Ok(ApiResponse::ok(data))
}

#[instrument(skip_all, fields(user_id = %req.actor))]
async fn store_purpose(State(state): State<AppState>, req: Payload<PurposeParams>) -> ApiResult<Purpose> {
    let data = state
        .run(move |conn| HierarchyService::store_purpose(conn, &req.actor, &req.body))
        .await?;
    Ok(ApiResponse::created(data).with_message("purpose saved"))
}

#[instrument(skip_all, fields(user_id = %req.actor, id = %id))]
async fn update_purpose(
    State(state): State<AppState>,
    Path(id): Path<String>,
    req: Payload<PurposePatch>,
) -> ApiResult<Purpose> {
    let data = state
        .run(move |conn| HierarchyService::update_purpose(conn, &req.actor, &id, &req.body))
        .await?;
    Ok(ApiResponse::ok(data).with_message("purpose updated"))
}

#[instrument(skip_all, fields(user_id = %user, id = %id))]
async fn delete_purpose(State(state): State<AppState>, Actor(user): Actor, Path(id): Path<String>) -> ApiResult<Value> {
    state.run(move |conn| HierarchyService::delete_purpose(conn, &user, &id)).await?;
    Ok(removed())
}

// ─────────────────────────────────────────────────────────────────────────────
// Long-term visions
// ─────────────────────────────────────────────────────────────────────────────

#[instrument(skip_all, fields(user_id = %user))]
async fn visions(State(state): State<AppState>, Actor(user): Actor) -> ApiResult<Vec<LongTermVision>> {
    let data = state.run(move |conn| HierarchyService::list_visions(conn, &user)).await?;
    Ok(ApiResponse::ok(data))
}

#[instrument(skip_all, fields(user_id = %user, id = %id))]
async fn vision(State(state): State<AppState>, Actor(user): Actor, Path(id): Path<String>) -> ApiResult<LongTermVision> {
    let data = state.run(move |conn| HierarchyService::get_vision(conn, &user, &id)).await?;
    Ok(ApiResponse::ok(data))
}

#[instrument(skip_all, fields(user_id = %req.actor))]
async fn store_vision(State(state): State<AppState>, req: Payload<VisionParams>) -> ApiResult<LongTermVision> {
    let data = state
        .run(move |conn| HierarchyService::store_vision(conn, &req.actor, &req.body))
        .await?;
    Ok(ApiResponse::created(data).with_message("vision saved"))
}

#[instrument(skip_all, fields(user_id = %req.actor, id = %id))]
async fn update_vision(
    State(state): State<AppState>,
    Path(id): Path<String>,
    req: Payload<VisionPatch>,
) -> ApiResult<LongTermVision> {
    let data = state
        .run(move |conn| HierarchyService::update_vision(conn, &req.actor, &id, &req.body))
        .await?;
    Ok(ApiResponse::ok(data).with_message("vision updated"))
}

#[instrument(skip_all, fields(user_id = %user, id = %id))]
async fn delete_vision(State(state): State<AppState>, Actor(user): Actor, Path(id): Path<String>) -> ApiResult<Value> {
    state.run(move |conn| HierarchyService::delete_vision(conn, &user, &id)).await?;
    Ok(removed())
}

// ─────────────────────────────────────────────────────────────────────────────
// Annual goals
// ─────────────────────────────────────────────────────────────────────────────

#[instrument(skip_all, fields(user_id = %user))]
async fn annual_goals(State(state): State<AppState>, Actor(user): Actor) -> ApiResult<Vec<AnnualGoal>> {
    let data = state.run(move |conn| HierarchyService::list_annual_goals(conn, &user)).await?;
    Ok(ApiResponse::ok(data))
}

#[instrument(skip_all, fields(user_id = %user, id = %id))]
async fn annual_goal(State(state): State<AppState>, Actor(user): Actor, Path(id): Path<String>) -> ApiResult<AnnualGoal> {
    let data = state.run(move |conn| HierarchyService::get_annual_goal(conn, &user, &id)).await?;
    Ok(ApiResponse::ok(data))
}

#[instrument(skip_all, fields(user_id = %req.actor))]
async fn store_annual_goal(State(state): State<AppState>, req: Payload<AnnualGoalParams>) -> ApiResult<AnnualGoal> {
    let data = state
        .run(move |conn| HierarchyService::store_annual_goal(conn, &req.actor, &req.body))
        .await?;
    Ok(ApiResponse::created(data).with_message("annual goal saved"))
}

#[instrument(skip_all, fields(user_id = %req.actor, id = %id))]
async fn update_annual_goal(
    State(state): State<AppState>,
    Path(id): Path<String>,
    req: Payload<AnnualGoalPatch>,
) -> ApiResult<AnnualGoal> {
    let data = state
        .run(move |conn| HierarchyService::update_annual_goal(conn, &req.actor, &id, &req.body))
        .await?;
    Ok(ApiResponse::ok(data).with_message("annual goal updated"))
}

#[instrument(skip_all, fields(user_id = %user, id = %id))]
async fn delete_annual_goal(
    State(state): State<AppState>,
    Actor(user): Actor,
    Path(id): Path<String>,
) -> ApiResult<Value> {
    state.run(move |conn| HierarchyService::delete_annual_goal(conn, &user, &id)).await?;
    Ok(removed())
}

// ─────────────────────────────────────────────────────────────────────────────
// Monthly goals
// ─────────────────────────────────────────────────────────────────────────────

#[instrument(skip_all, fields(user_id = %user))]
async fn monthly_goals(State(state): State<AppState>, Actor(user): Actor) -> ApiResult<Vec<MonthlyGoal>> {
    let data = state.run(move |conn| HierarchyService::list_monthly_goals(conn, &user)).await?;
    Ok(ApiResponse::ok(data))
}

#[instrument(skip_all, fields(user_id = %user, id = %id))]
async fn monthly_goal(State(state): State<AppState>, Actor(user): Actor, Path(id): Path<String>) -> ApiResult<MonthlyGoal> {
    let data = state.run(move |conn| HierarchyService::get_monthly_goal(conn, &user, &id)).await?;
    Ok(ApiResponse::ok(data))
}

#[instrument(skip_all, fields(user_id = %req.actor))]
async fn store_monthly_goal(State(state): State<AppState>, req: Payload<MonthlyGoalParams>) -> ApiResult<MonthlyGoal> {
    let data = state
        .run(move |conn| HierarchyService::store_monthly_goal(conn, &req.actor, &req.body))
        .await?;
    Ok(ApiResponse::created(data).with_message("monthly goal saved"))
}

#[instrument(skip_all, fields(user_id = %req.actor, id = %id))]
async fn update_monthly_goal(
    State(state): State<AppState>,
    Path(id): Path<String>,
    req: Payload<MonthlyGoalPatch>,
) -> ApiResult<MonthlyGoal> {
    let data = state
        .run(move |conn| HierarchyService::update_monthly_goal(conn, &req.actor, &id, &req.body))
        .await?;
    Ok(ApiResponse::ok(data).with_message("monthly goal updated"))
}

#[instrument(skip_all, fields(user_id = %user, id = %id))]
async fn delete_monthly_goal(
    State(state): State<AppState>,
    Actor(user): Actor,
    Path(id): Path<String>,
) -> ApiResult<Value> {
    state.run(move |conn| HierarchyService::delete_monthly_goal(conn, &user, &id)).await?;
    Ok(removed())
}

#[instrument(skip_all, fields(user_id = %req.actor, count = req.body.ids.len()))]
async fn delete_monthly_goals(State(state): State<AppState>, req: Payload<IdsBody>) -> ApiResult<Value> {
    let count = state
        .run(move |conn| HierarchyService::delete_monthly_goals(conn, &req.actor, &req.body.ids))
        .await?;
    Ok(deleted(count))
}

// ─────────────────────────────────────────────────────────────────────────────
// Projects
// ─────────────────────────────────────────────────────────────────────────────

#[instrument(skip_all, fields(user_id = %user))]
async fn projects(State(state): State<AppState>, Actor(user): Actor) -> ApiResult<Vec<Project>> {
    let data = state.run(move |conn| ProjectService::list(conn, &user)).await?;
    Ok(ApiResponse::ok(data))
}

#[instrument(skip_all, fields(user_id = %user))]
async fn archived_projects(State(state): State<AppState>, Actor(user): Actor) -> ApiResult<Vec<Project>> {
    let data = state.run(move |conn| ProjectService::list_archived(conn, &user)).await?;
    Ok(ApiResponse::ok(data))
}

#[instrument(skip_all, fields(user_id = %user, id = %id))]
async fn project(State(state): State<AppState>, Actor(user): Actor, Path(id): Path<String>) -> ApiResult<Project> {
    let data = state.run(move |conn| ProjectService::get(conn, &user, &id)).await?;
    Ok(ApiResponse::ok(data))
}

#[instrument(skip_all, fields(user_id = %req.actor))]
async fn store_project(State(state): State<AppState>, req: Payload<ProjectParams>) -> ApiResult<Project> {
    let data = state
        .run(move |conn| ProjectService::store(conn, &req.actor, &req.body))
        .await?;
    Ok(ApiResponse::created(data).with_message("project saved"))
}

#[instrument(skip_all, fields(user_id = %req.actor, id = %id))]
async fn update_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
    req: Payload<ProjectPatch>,
) -> ApiResult<Project> {
    let data = state
        .run(move |conn| ProjectService::update(conn, &req.actor, &id, &req.body))
        .await?;
    Ok(ApiResponse::ok(data).with_message("project updated"))
}

#[instrument(skip_all, fields(user_id = %user, id = %id))]
async fn delete_project(State(state): State<AppState>, Actor(user): Actor, Path(id): Path<String>) -> ApiResult<Value> {
    state.run(move |conn| ProjectService::delete(conn, &user, &id)).await?;
    Ok(removed())
}

#[instrument(skip_all, fields(user_id = %req.actor, id = %id))]
async fn archive_project(State(state): State<AppState>, Path(id): Path<String>, req: Bare) -> ApiResult<Project> {
    let data = state
        .run(move |conn| ProjectService::toggle_archive(conn, &req.actor, &id))
        .await?;
    let message = if data.is_archived { "project archived" } else { "project restored" };
    Ok(ApiResponse::ok(data).with_message(message))
}

#[instrument(skip_all, fields(user_id = %req.actor, count = req.body.ids.len()))]
async fn delete_projects(State(state): State<AppState>, req: Payload<IdsBody>) -> ApiResult<Value> {
    let count = state
        .run(move |conn| ProjectService::delete_many(conn, &req.actor, &req.body.ids))
        .await?;
    Ok(deleted(count))
}

#[instrument(skip_all, fields(user_id = %req.actor, count = req.body.ids.len()))]
async fn archive_projects(State(state): State<AppState>, req: Payload<IdsBody>) -> ApiResult<Value> {
    let count = state
        .run(move |conn| ProjectService::toggle_archive_many(conn, &req.actor, &req.body.ids))
        .await?;
    Ok(ApiResponse::ok(json!({ "updated_count": count })).with_message(format!("{count} projects toggled")))
}
