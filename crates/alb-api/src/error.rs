//! Mapping of control plane errors onto HTTP responses.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::debug;

use alb_control::ControlError;
use alb_registry::ErrorKind;

/// Response wrapper for mutations and errors.
#[derive(serde::Serialize)]
pub(crate) struct ApiResponse {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl ApiResponse {
    pub(crate) fn ok() -> Json<Self> {
        Json(Self {
            success: true,
            error: None,
        })
    }
}

fn error_response(msg: String, status: StatusCode) -> Response {
    (
        status,
        Json(ApiResponse {
            success: false,
            error: Some(msg),
        }),
    )
        .into_response()
}

/// Everything a handler can fail with.
#[derive(Debug)]
pub enum ApiError {
    Control(ControlError),
    /// The request body could not be read as the expected shape.
    BadInput(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Control(ControlError::Registry(e)) => match e.kind() {
                ErrorKind::NotFound => StatusCode::NOT_FOUND,
                ErrorKind::AlreadyExists => StatusCode::CONFLICT,
                ErrorKind::InvalidInput => StatusCode::UNPROCESSABLE_ENTITY,
            },
            ApiError::Control(ControlError::Propagation(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::BadInput(_) => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }
}

impl From<ControlError> for ApiError {
    fn from(err: ControlError) -> Self {
        ApiError::Control(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadInput(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let msg = match self {
            ApiError::Control(e) => e.to_string(),
            ApiError::BadInput(msg) => msg,
        };
        debug!(%status, error = %msg, "request failed");
        error_response(msg, status)
    }
}
