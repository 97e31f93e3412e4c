//! Response envelope and error mapping.
//!
//! Successes serialize as `{status: true, message?, data}`; failures as
//! `{status: false, message, code, error?}` with the HTTP status taken from
//! [`ErrorCode::http_status`]. Unexpected failures keep their detail out of
//! the body unless the server runs with `debug` on.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::warn;

use waypoint_core::{DomainError, ErrorCode};

const INTERNAL_MESSAGE: &str = "internal server error";

/// A successful response.
#[derive(Debug)]
pub struct ApiResponse<T> {
    status: StatusCode,
    message: Option<String>,
    data: T,
}

#[derive(Serialize)]
struct SuccessBody<'a, T> {
    status: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'a str>,
    data: &'a T,
}

impl<T> ApiResponse<T> {
    /// 200 with data.
    pub fn ok(data: T) -> Self {
        Self {
            status: StatusCode::OK,
            message: None,
            data,
        }
    }

    /// 201 with the created entity.
    pub fn created(data: T) -> Self {
        Self {
            status: StatusCode::CREATED,
            message: None,
            data,
        }
    }

    /// Attach a human-readable message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let body = SuccessBody {
            status: true,
            message: self.message.as_deref(),
            data: &self.data,
        };
        (self.status, Json(body)).into_response()
    }
}

/// Handler result type.
pub type ApiResult<T> = Result<ApiResponse<T>, ApiError>;

/// A failed request.
#[derive(Debug)]
pub struct ApiError {
    source: DomainError,
    expose_detail: bool,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    status: bool,
    message: String,
    code: ErrorCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    blocked_ids: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    blocked_count: Option<usize>,
}

impl ApiError {
    /// Wrap a domain error. `expose_detail` puts the detail of an
    /// unexpected failure in the body.
    pub fn new(source: DomainError, expose_detail: bool) -> Self {
        Self { source, expose_detail }
    }

    /// The wrapped error.
    pub fn error(&self) -> &DomainError {
        &self.source
    }

    fn body(self) -> (StatusCode, ErrorBody) {
        let code = self.source.code();
        let status = StatusCode::from_u16(code.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if self.source.is_internal() {
            warn!(error = %self.source, "request failed unexpectedly");
            let body = ErrorBody {
                status: false,
                message: INTERNAL_MESSAGE.into(),
                code,
                error: self.expose_detail.then(|| self.source.to_string()),
                blocked_ids: None,
                blocked_count: None,
            };
            return (status, body);
        }

        let message = self.source.to_string();
        let blocked = match self.source {
            DomainError::Blocked { ids, .. } => Some(ids),
            _ => None,
        };
        let body = ErrorBody {
            status: false,
            message,
            code,
            error: None,
            blocked_count: blocked.as_ref().map(Vec::len),
            blocked_ids: blocked,
        };
        (status, body)
    }
}

impl From<DomainError> for ApiError {
    fn from(source: DomainError) -> Self {
        Self::new(source, false)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = self.body();
        (status, Json(body)).into_response()
    }
}
