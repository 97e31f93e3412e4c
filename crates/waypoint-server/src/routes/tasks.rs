use axum::Router;
use axum::extract::{Path, State};
use axum::routing::{get, patch, post};
use serde::Deserialize;
use serde_json::Value;
use tracing::instrument;

use waypoint_planner::TaskService;
use waypoint_planner::types::{MovedToList, Task, TaskFilter, TaskParams, TaskPatch, TaskView};

use super::{Bare, IdsBody, deleted, removed};
use crate::envelope::{ApiResponse, ApiResult};
use crate::identity::{Actor, Filter, Payload};
use crate::server::AppState;

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/tasks", get(index).post(store))
        .route("/tasks/list_only", get(list_only))
        .route("/tasks/project_only", get(project_only))
        .route("/tasks/delete_multiple", post(delete_many))
        .route("/tasks/move_multiple", patch(move_many_to_list))
        .route("/tasks/move_multiple_to_project", post(move_many_to_project))
        .route("/tasks/{id}", get(show).put(update).delete(delete))
        .route("/tasks/{id}/toggle", patch(toggle))
        .route("/tasks/{id}/move", patch(move_to_list))
        .route("/tasks/{id}/move_to_project", post(move_to_project))
        .route("/tasks/{id}/link_to_list", patch(link_to_list))
        .route("/projects/{id}/tasks", get(for_project))
}

#[derive(Debug, Deserialize)]
struct MoveToListBody {
    list_id: String,
}

#[derive(Debug, Deserialize)]
struct MoveManyToListBody {
    ids: Vec<String>,
    list_id: String,
}

#[derive(Debug, Deserialize)]
struct MoveToProjectBody {
    project_id: String,
    order_index: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct MoveManyToProjectBody {
    ids: Vec<String>,
    project_id: String,
    order_index: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
struct LinkBody {
    list_id: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Reads
// ─────────────────────────────────────────────────────────────────────────────

#[instrument(skip_all, fields(user_id = %user))]
async fn index(
    State(state): State<AppState>,
    Actor(user): Actor,
    Filter(filter): Filter<TaskFilter>,
) -> ApiResult<Vec<TaskView>> {
    let data = state.run(move |conn| TaskService::list(conn, &user, &filter)).await?;
    Ok(ApiResponse::ok(data))
}

#[instrument(skip_all, fields(user_id = %user))]
async fn list_only(State(state): State<AppState>, Actor(user): Actor) -> ApiResult<Vec<TaskView>> {
    let data = state.run(move |conn| TaskService::list_only(conn, &user)).await?;
    Ok(ApiResponse::ok(data))
}

#[instrument(skip_all, fields(user_id = %user))]
async fn project_only(State(state): State<AppState>, Actor(user): Actor) -> ApiResult<Vec<TaskView>> {
    let data = state.run(move |conn| TaskService::project_only(conn, &user)).await?;
    Ok(ApiResponse::ok(data))
}

#[instrument(skip_all, fields(user_id = %user, project_id = %id))]
async fn for_project(
    State(state): State<AppState>,
    Actor(user): Actor,
    Path(id): Path<String>,
    Filter(filter): Filter<TaskFilter>,
) -> ApiResult<Vec<TaskView>> {
    let data = state
        .run(move |conn| TaskService::for_project(conn, &user, &id, &filter))
        .await?;
    Ok(ApiResponse::ok(data))
}

#[instrument(skip_all, fields(user_id = %user, id = %id))]
async fn show(State(state): State<AppState>, Actor(user): Actor, Path(id): Path<String>) -> ApiResult<TaskView> {
    let data = state.run(move |conn| TaskService::get(conn, &user, &id)).await?;
    Ok(ApiResponse::ok(data))
}

// ─────────────────────────────────────────────────────────────────────────────
// Writes
// ─────────────────────────────────────────────────────────────────────────────

#[instrument(skip_all, fields(user_id = %req.actor))]
async fn store(State(state): State<AppState>, req: Payload<TaskParams>) -> ApiResult<Task> {
    let data = state.run(move |conn| TaskService::store(conn, &req.actor, &req.body)).await?;
    Ok(ApiResponse::created(data).with_message("task saved"))
}

#[instrument(skip_all, fields(user_id = %req.actor, id = %id))]
async fn update(State(state): State<AppState>, Path(id): Path<String>, req: Payload<TaskPatch>) -> ApiResult<Task> {
    let data = state
        .run(move |conn| TaskService::update(conn, &req.actor, &id, &req.body))
        .await?;
    Ok(ApiResponse::ok(data).with_message("task updated"))
}

#[instrument(skip_all, fields(user_id = %req.actor, id = %id))]
async fn toggle(State(state): State<AppState>, Path(id): Path<String>, req: Bare) -> ApiResult<Task> {
    let data = state.run(move |conn| TaskService::toggle(conn, &req.actor, &id)).await?;
    Ok(ApiResponse::ok(data))
}

#[instrument(skip_all, fields(user_id = %user, id = %id))]
async fn delete(State(state): State<AppState>, Actor(user): Actor, Path(id): Path<String>) -> ApiResult<Value> {
    state.run(move |conn| TaskService::destroy(conn, &user, &id)).await?;
    Ok(removed())
}

#[instrument(skip_all, fields(user_id = %req.actor, count = req.body.ids.len()))]
async fn delete_many(State(state): State<AppState>, req: Payload<IdsBody>) -> ApiResult<Value> {
    let count = state
        .run(move |conn| TaskService::destroy_many(conn, &req.actor, &req.body.ids))
        .await?;
    Ok(deleted(count))
}

// ─────────────────────────────────────────────────────────────────────────────
// Moves
// ─────────────────────────────────────────────────────────────────────────────

#[instrument(skip_all, fields(user_id = %req.actor, id = %id))]
async fn move_to_list(
    State(state): State<AppState>,
    Path(id): Path<String>,
    req: Payload<MoveToListBody>,
) -> ApiResult<Task> {
    let data = state
        .run(move |conn| TaskService::move_to_list(conn, &req.actor, &id, &req.body.list_id))
        .await?;
    Ok(ApiResponse::ok(data).with_message("task moved"))
}

#[instrument(skip_all, fields(user_id = %req.actor, count = req.body.ids.len()))]
async fn move_many_to_list(State(state): State<AppState>, req: Payload<MoveManyToListBody>) -> ApiResult<MovedToList> {
    let data = state
        .run(move |conn| TaskService::move_many_to_list(conn, &req.actor, &req.body.ids, &req.body.list_id))
        .await?;
    let message = format!("{} tasks moved", data.moved_count);
    Ok(ApiResponse::ok(data).with_message(message))
}

#[instrument(skip_all, fields(user_id = %req.actor, id = %id))]
async fn move_to_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
    req: Payload<MoveToProjectBody>,
) -> ApiResult<Task> {
    let data = state
        .run(move |conn| {
            TaskService::move_to_project(conn, &req.actor, &id, &req.body.project_id, req.body.order_index)
        })
        .await?;
    Ok(ApiResponse::ok(data).with_message("task moved"))
}

#[instrument(skip_all, fields(user_id = %req.actor, count = req.body.ids.len()))]
async fn move_many_to_project(
    State(state): State<AppState>,
    req: Payload<MoveManyToProjectBody>,
) -> ApiResult<Vec<Task>> {
    let data = state
        .run(move |conn| {
            let body = &req.body;
            TaskService::move_many_to_project(conn, &req.actor, &body.ids, &body.project_id, body.order_index)
        })
        .await?;
    let message = format!("{} tasks moved", data.len());
    Ok(ApiResponse::ok(data).with_message(message))
}

#[instrument(skip_all, fields(user_id = %req.actor, id = %id))]
async fn link_to_list(State(state): State<AppState>, Path(id): Path<String>, req: Payload<LinkBody>) -> ApiResult<Task> {
    let data = state
        .run(move |conn| TaskService::link_to_action_list(conn, &req.actor, &id, req.body.list_id.as_deref()))
        .await?;
    Ok(ApiResponse::ok(data).with_message("task linked"))
}
