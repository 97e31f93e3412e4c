//! Request extractors: the acting user, a JSON body, and query filters.
//!
//! A request may claim an identity through the `user_id` of the JSON body,
//! the `user_id` query parameter, and the `x-user-id` header. Every claim
//! present must name the same user. The authenticated identity is the
//! `x-authenticated-user` header set by the fronting auth layer. Both go
//! through [`resolve_claims`].
//!
//! Rejections render through [`ApiError`], so a bad body or query string
//! answers with the usual error envelope.

use axum::body::Bytes;
use axum::extract::{FromRequest, FromRequestParts, Query, Request};
use axum::http::request::Parts;
use axum::http::{HeaderMap, Uri};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use waypoint_core::{DomainError, UserId, resolve_claims};

use crate::envelope::ApiError;

/// Header carrying a caller-claimed user.
pub const CLAIMED_USER_HEADER: &str = "x-user-id";
/// Header carrying the user established by the auth layer.
pub const AUTHENTICATED_USER_HEADER: &str = "x-authenticated-user";

#[derive(Deserialize)]
struct IdentityQuery {
    user_id: Option<String>,
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_owned)
}

fn resolve(uri: &Uri, headers: &HeaderMap, body_claim: Option<String>) -> Result<UserId, ApiError> {
    let query_claim = Query::<IdentityQuery>::try_from_uri(uri)
        .ok()
        .and_then(|Query(q)| q.user_id);
    let header_claim = header(headers, CLAIMED_USER_HEADER);
    let authenticated = header(headers, AUTHENTICATED_USER_HEADER);
    Ok(resolve_claims(
        [body_claim.as_deref(), query_claim.as_deref(), header_claim.as_deref()],
        authenticated.as_deref(),
    )?)
}

/// The `user_id` a JSON body claims. Integers are taken as their decimal
/// text; any other non-string value is malformed.
fn body_claim(value: &Value) -> Result<Option<String>, DomainError> {
    match value.get("user_id") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(Value::Number(n)) if n.is_i64() || n.is_u64() => Ok(Some(n.to_string())),
        Some(other) => Err(DomainError::validation(format!(
            "user_id must be a string, got {other}"
        ))),
    }
}

/// The acting user of a request without a body.
#[derive(Debug, Clone)]
pub struct Actor(pub UserId);

impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        resolve(&parts.uri, &parts.headers, None).map(Actor)
    }
}

/// The acting user plus a JSON body that may itself carry `user_id`.
///
/// An empty body deserializes as `{}`.
#[derive(Debug)]
pub struct Payload<T> {
    /// Resolved acting user.
    pub actor: UserId,
    /// Deserialized body.
    pub body: T,
}

impl<S, T> FromRequest<S> for Payload<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let uri = req.uri().clone();
        let headers = req.headers().clone();
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| DomainError::validation(format!("unreadable request body: {e}")))?;

        let value: Value = if bytes.iter().all(u8::is_ascii_whitespace) {
            Value::Object(serde_json::Map::new())
        } else {
            serde_json::from_slice(&bytes).map_err(|e| DomainError::validation(format!("malformed JSON body: {e}")))?
        };
        let actor = resolve(&uri, &headers, body_claim(&value)?)?;
        let body = serde_json::from_value(value).map_err(|e| DomainError::validation(e.to_string()))?;
        Ok(Self { actor, body })
    }
}

/// Query-string filters deserialized into `T`.
#[derive(Debug, Clone, Default)]
pub struct Filter<T>(pub T);

impl<S, T> FromRequestParts<S> for Filter<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Query(filter) = Query::<T>::try_from_uri(&parts.uri)
            .map_err(|e| DomainError::validation(format!("bad query string: {}", e.body_text())))?;
        Ok(Self(filter))
    }
}
