//! `/v1` route table.
//!
//! Handlers are thin: extract the actor and inputs, hand a closure to
//! [`AppState::run`], wrap the result in an [`ApiResponse`].

mod actions;
mod challenges;
mod communities;
mod hierarchy;
mod lists;
mod tasks;

use axum::Router;
use serde::Deserialize;
use serde::de::IgnoredAny;
use serde_json::{Value, json};

use crate::envelope::ApiResponse;
use crate::identity::Payload;
use crate::server::AppState;

/// Every `/v1` route except health, without state.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(hierarchy::routes())
        .merge(lists::routes())
        .merge(tasks::routes())
        .merge(actions::routes())
        .merge(communities::routes())
        .merge(challenges::routes())
}

/// A request whose body carries nothing but, optionally, `user_id`.
pub(crate) type Bare = Payload<IgnoredAny>;

/// `{ids: [...]}` for bulk operations.
#[derive(Debug, Deserialize)]
pub(crate) struct IdsBody {
    pub ids: Vec<String>,
}

pub(crate) fn deleted(count: usize) -> ApiResponse<Value> {
    ApiResponse::ok(json!({ "deleted_count": count })).with_message(format!("{count} deleted"))
}

pub(crate) fn removed() -> ApiResponse<Value> {
    ApiResponse::ok(Value::Null).with_message("deleted")
}
