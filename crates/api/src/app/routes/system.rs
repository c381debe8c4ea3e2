use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};

use crate::app::dto;
use crate::context::CallerContext;

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

/// The caller's local user record, created on first sight of the token.
pub async fn whoami(Extension(caller): Extension<CallerContext>) -> axum::response::Response {
    dto::ok(StatusCode::OK, caller.user())
}
