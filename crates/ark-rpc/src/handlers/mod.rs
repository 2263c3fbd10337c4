//! HTTP request handlers, split by domain.

pub mod lifecycle;
pub mod logs;
pub mod servers;

use ark_core::ArkError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use tracing::{error, warn};

/// Error body: `{"status": "error", "message": ...}` with the matching code.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn busy(id: u32) -> Self {
        Self {
            status: StatusCode::CONFLICT,
            message: format!("An installer operation is already in progress for server {}", id),
        }
    }
}

impl From<ArkError> for ApiError {
    fn from(err: ArkError) -> Self {
        let status =
            StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            error!("Request failed: {}", err);
        } else {
            warn!("Request rejected: {}", err);
        }
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(json!({"status": "error", "message": self.message})),
        )
            .into_response()
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// `{"status": "success", "message": ...}` merged with `extra`'s fields.
pub(crate) fn success(message: impl Into<String>, extra: Value) -> Json<Value> {
    let mut body = json!({"status": "success", "message": message.into()});
    if let (Some(target), Value::Object(fields)) = (body.as_object_mut(), extra) {
        target.extend(fields);
    }
    Json(body)
}

/// Health check endpoint.
pub async fn handle_health() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}
