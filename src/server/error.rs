//! Mapping of pipeline errors to HTTP responses.

use std::any::Any;

use axum::Json;
use axum::body::Body;
use axum::http::{Response, StatusCode};
use axum::response::IntoResponse;
use serde_json::json;

use crate::talk::core::errors::TalkError;

/// HTTP status for a pipeline error.
#[must_use]
pub const fn status_for(err: &TalkError) -> StatusCode {
    match err {
        TalkError::Configuration(_) => StatusCode::SERVICE_UNAVAILABLE,
        TalkError::InvalidInput(_) => StatusCode::UNPROCESSABLE_ENTITY,
        TalkError::Generation(_)
        | TalkError::EmptyCompletion
        | TalkError::MalformedResponse(_)
        | TalkError::SchemaViolation { .. }
        | TalkError::Http(_)
        | TalkError::Url(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for TalkError {
    fn into_response(self) -> axum::response::Response {
        let status = status_for(&self);
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

/// Render a panic caught in a handler as a plain 500 carrying only its message.
#[must_use]
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response<Body> {
    let message = panic
        .downcast_ref::<String>()
        .cloned()
        .or_else(|| panic.downcast_ref::<&str>().map(|s| (*s).to_string()))
        .unwrap_or_else(|| "internal server error".to_string());
    tracing::error!("Handler panicked: {message}");

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "detail": message })),
    )
        .into_response()
}
