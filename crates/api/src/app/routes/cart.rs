use std::sync::Arc;

use axum::{
    extract::Extension,
    http::StatusCode,
    routing::get,
    Router,
};

use gadgetbazar_infra::{store::CartItem, Services};

use crate::app::{dto, errors};
use crate::context::CallerContext;

pub fn router() -> Router {
    Router::new().route("/", get(get_cart).post(add_to_cart).delete(clear_cart))
}

pub async fn get_cart(
    Extension(services): Extension<Arc<Services>>,
    Extension(caller): Extension<CallerContext>,
) -> axum::response::Response {
    match services.carts.items(caller.user_id()).await {
        Ok(items) => dto::ok(StatusCode::OK, items),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn add_to_cart(
    Extension(services): Extension<Arc<Services>>,
    Extension(caller): Extension<CallerContext>,
    dto::JsonBody(body): dto::JsonBody<CartItem>,
) -> axum::response::Response {
    match services.carts.add(caller.user_id(), body).await {
        Ok(items) => dto::ok(StatusCode::OK, items),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn clear_cart(
    Extension(services): Extension<Arc<Services>>,
    Extension(caller): Extension<CallerContext>,
) -> axum::response::Response {
    match services.carts.clear(caller.user_id()).await {
        Ok(()) => dto::done("cart cleared"),
        Err(e) => errors::service_error_to_response(e),
    }
}
