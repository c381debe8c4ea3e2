//! Admin gate for the `/admin` subtree.

use axum::{extract::Request, http::StatusCode, middleware::Next, response::Response};

use gadgetbazar_auth::require_admin;

use crate::app::errors;
use crate::context::CallerContext;

/// Rejects callers without the admin role with 403.
///
/// Runs after the auth middleware, which supplies the [`CallerContext`].
pub async fn admin_only(req: Request, next: Next) -> Response {
    let Some(caller) = req.extensions().get::<CallerContext>() else {
        return errors::json_error(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", "authentication required");
    };
    if let Err(e) = require_admin(caller.role()) {
        tracing::debug!(user_id = %caller.user_id(), "admin route refused");
        return errors::json_error(StatusCode::FORBIDDEN, "FORBIDDEN", e.to_string());
    }
    next.run(req).await
}
