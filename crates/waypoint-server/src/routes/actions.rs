use axum::Router;
use axum::extract::{Path, State};
use axum::routing::{get, patch, post};
use serde::Deserialize;
use serde_json::Value;
use tracing::instrument;

use waypoint_planner::ActionService;
use waypoint_planner::types::{ActionMirror, ActionParams, ActionPatch, ProjectAction};

use super::{Bare, IdsBody, deleted, removed};
use crate::envelope::{ApiResponse, ApiResult};
use crate::identity::{Actor, Filter, Payload};
use crate::server::AppState;

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/project_actions", get(index).post(store))
        .route("/project_actions/move_multiple", post(move_many))
        .route("/project_actions/delete_multiple", post(delete_many))
        .route("/project_actions/{id}", get(show).put(update).delete(delete))
        .route("/project_actions/{id}/toggle", patch(toggle))
        .route("/project_actions/{id}/move", post(move_to))
        .route("/project_actions/{id}/link_to_list", post(link_to_list))
}

#[derive(Debug, Deserialize)]
struct ProjectFilter {
    project_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OrderBody {
    order_index: i64,
}

#[derive(Debug, Deserialize)]
struct MoveManyBody {
    ids: Vec<String>,
    order_index: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
struct LinkBody {
    list_id: Option<String>,
    task_id: Option<String>,
}

#[instrument(skip_all, fields(user_id = %user))]
async fn index(
    State(state): State<AppState>,
    Actor(user): Actor,
    Filter(filter): Filter<ProjectFilter>,
) -> ApiResult<Vec<ProjectAction>> {
    let data = state
        .run(move |conn| ActionService::list(conn, &user, filter.project_id.as_deref()))
        .await?;
    Ok(ApiResponse::ok(data))
}

#[instrument(skip_all, fields(user_id = %user, id = %id))]
async fn show(State(state): State<AppState>, Actor(user): Actor, Path(id): Path<String>) -> ApiResult<ProjectAction> {
    let data = state.run(move |conn| ActionService::get(conn, &user, &id)).await?;
    Ok(ApiResponse::ok(data))
}

#[instrument(skip_all, fields(user_id = %req.actor))]
async fn store(State(state): State<AppState>, req: Payload<ActionParams>) -> ApiResult<ProjectAction> {
    let data = state
        .run(move |conn| ActionService::store(conn, &req.actor, &req.body))
        .await?;
    Ok(ApiResponse::created(data).with_message("action saved"))
}

#[instrument(skip_all, fields(user_id = %req.actor, id = %id))]
async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    req: Payload<ActionPatch>,
) -> ApiResult<ProjectAction> {
    let data = state
        .run(move |conn| ActionService::update(conn, &req.actor, &id, &req.body))
        .await?;
    Ok(ApiResponse::ok(data).with_message("action updated"))
}

#[instrument(skip_all, fields(user_id = %req.actor, id = %id))]
async fn toggle(State(state): State<AppState>, Path(id): Path<String>, req: Bare) -> ApiResult<ProjectAction> {
    let data = state.run(move |conn| ActionService::toggle(conn, &req.actor, &id)).await?;
    Ok(ApiResponse::ok(data))
}

#[instrument(skip_all, fields(user_id = %req.actor, id = %id))]
async fn move_to(State(state): State<AppState>, Path(id): Path<String>, req: Payload<OrderBody>) -> ApiResult<ProjectAction> {
    let data = state
        .run(move |conn| ActionService::move_to(conn, &req.actor, &id, req.body.order_index))
        .await?;
    Ok(ApiResponse::ok(data).with_message("action moved"))
}

#[instrument(skip_all, fields(user_id = %req.actor, count = req.body.ids.len()))]
async fn move_many(State(state): State<AppState>, req: Payload<MoveManyBody>) -> ApiResult<Vec<ProjectAction>> {
    let data = state
        .run(move |conn| ActionService::move_many(conn, &req.actor, &req.body.ids, req.body.order_index))
        .await?;
    let message = format!("{} actions moved", data.len());
    Ok(ApiResponse::ok(data).with_message(message))
}

#[instrument(skip_all, fields(user_id = %user, id = %id))]
async fn delete(State(state): State<AppState>, Actor(user): Actor, Path(id): Path<String>) -> ApiResult<Value> {
    state.run(move |conn| ActionService::destroy(conn, &user, &id)).await?;
    Ok(removed())
}

#[instrument(skip_all, fields(user_id = %req.actor, count = req.body.ids.len()))]
async fn delete_many(State(state): State<AppState>, req: Payload<IdsBody>) -> ApiResult<Value> {
    let count = state
        .run(move |conn| ActionService::destroy_many(conn, &req.actor, &req.body.ids))
        .await?;
    Ok(deleted(count))
}

#[instrument(skip_all, fields(user_id = %req.actor, id = %id))]
async fn link_to_list(
    State(state): State<AppState>,
    Path(id): Path<String>,
    req: Payload<LinkBody>,
) -> ApiResult<ActionMirror> {
    let data = state
        .run(move |conn| {
            let body = &req.body;
            ActionService::link_to_list(conn, &req.actor, &id, body.list_id.as_deref(), body.task_id.as_deref())
        })
        .await?;
    Ok(ApiResponse::ok(data).with_message("action linked"))
}
