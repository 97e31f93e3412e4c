use axum::Router;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use serde_json::Value;
use tracing::instrument;

use waypoint_planner::ListService;
use waypoint_planner::types::{ListParams, ListPatch, TaskList, TaskView};

use super::{IdsBody, deleted, removed};
use crate::envelope::{ApiResponse, ApiResult};
use crate::identity::{Actor, Payload};
use crate::server::AppState;

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/lists", get(index).post(store))
        .route("/lists/delete_multiple", post(delete_many))
        .route("/lists/{id}", get(show).put(update).delete(delete))
        .route("/lists/{id}/tasks", get(tasks))
}

#[instrument(skip_all, fields(user_id = %user))]
async fn index(State(state): State<AppState>, Actor(user): Actor) -> ApiResult<Vec<TaskList>> {
    let data = state.run(move |conn| ListService::list(conn, &user)).await?;
    Ok(ApiResponse::ok(data))
}

#[instrument(skip_all, fields(user_id = %user, id = %id))]
async fn show(State(state): State<AppState>, Actor(user): Actor, Path(id): Path<String>) -> ApiResult<TaskList> {
    let data = state.run(move |conn| ListService::get(conn, &user, &id)).await?;
    Ok(ApiResponse::ok(data))
}

#[instrument(skip_all, fields(user_id = %user, id = %id))]
async fn tasks(State(state): State<AppState>, Actor(user): Actor, Path(id): Path<String>) -> ApiResult<Vec<TaskView>> {
    let data = state.run(move |conn| ListService::tasks(conn, &user, &id)).await?;
    Ok(ApiResponse::ok(data))
}

#[instrument(skip_all, fields(user_id = %req.actor))]
async fn store(State(state): State<AppState>, req: Payload<ListParams>) -> ApiResult<TaskList> {
    let data = state.run(move |conn| ListService::store(conn, &req.actor, &req.body)).await?;
    Ok(ApiResponse::created(data).with_message("list saved"))
}

#[instrument(skip_all, fields(user_id = %req.actor, id = %id))]
async fn update(State(state): State<AppState>, Path(id): Path<String>, req: Payload<ListPatch>) -> ApiResult<TaskList> {
    let data = state
        .run(move |conn| ListService::update(conn, &req.actor, &id, &req.body))
        .await?;
    Ok(ApiResponse::ok(data).with_message("list updated"))
}

#[instrument(skip_all, fields(user_id = %user, id = %id))]
async fn delete(State(state): State<AppState>, Actor(user): Actor, Path(id): Path<String>) -> ApiResult<Value> {
    state.run(move |conn| ListService::delete(conn, &user, &id)).await?;
    Ok(removed())
}

#[instrument(skip_all, fields(user_id = %req.actor, count = req.body.ids.len()))]
async fn delete_many(State(state): State<AppState>, req: Payload<IdsBody>) -> ApiResult<Value> {
    let count = state
        .run(move |conn| ListService::delete_many(conn, &req.actor, &req.body.ids))
        .await?;
    Ok(deleted(count))
}
