use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    routing::{get, put},
    Router,
};

use gadgetbazar_core::NotificationId;
use gadgetbazar_infra::Services;

use crate::app::{dto, errors};
use crate::context::CallerContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_notifications))
        .route("/unread-count", get(unread_count))
        .route("/read-all", put(mark_all_read))
        .route("/:id/read", put(mark_read))
}

pub async fn list_notifications(
    Extension(services): Extension<Arc<Services>>,
    Extension(caller): Extension<CallerContext>,
) -> axum::response::Response {
    match services.inbox.list(caller.user_id()).await {
        Ok(items) => dto::ok(StatusCode::OK, items),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn unread_count(
    Extension(services): Extension<Arc<Services>>,
    Extension(caller): Extension<CallerContext>,
) -> axum::response::Response {
    match services.inbox.unread_count(caller.user_id()).await {
        Ok(count) => dto::ok(StatusCode::OK, serde_json::json!({ "count": count })),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn mark_read(
    Extension(services): Extension<Arc<Services>>,
    Extension(caller): Extension<CallerContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: NotificationId = match errors::parse_id(&id, "notification") {
        Ok(v) => v,
        Err(res) => return res,
    };
    match services.inbox.mark_read(caller.user_id(), id).await {
        Ok(()) => dto::done("notification marked as read"),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn mark_all_read(
    Extension(services): Extension<Arc<Services>>,
    Extension(caller): Extension<CallerContext>,
) -> axum::response::Response {
    match services.inbox.mark_all_read(caller.user_id()).await {
        Ok(updated) => dto::ok(StatusCode::OK, serde_json::json!({ "updated": updated })),
        Err(e) => errors::service_error_to_response(e),
    }
}
