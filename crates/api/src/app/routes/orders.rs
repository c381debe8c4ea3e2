use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    routing::get,
    Router,
};

use gadgetbazar_core::OrderId;
use gadgetbazar_infra::Services;
use gadgetbazar_orders::PlaceOrder;

use crate::app::{dto, errors};
use crate::context::CallerContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_my_orders).post(place_order))
        .route("/:id", get(get_my_order).delete(delete_my_order))
}

/// Reserve stock and record the order. Notifies the admins; clears the cart.
pub async fn place_order(
    Extension(services): Extension<Arc<Services>>,
    Extension(caller): Extension<CallerContext>,
    dto::JsonBody(body): dto::JsonBody<PlaceOrder>,
) -> axum::response::Response {
    match services.orders.place_order(caller.user(), body).await {
        Ok(order) => dto::ok(StatusCode::CREATED, order),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn list_my_orders(
    Extension(services): Extension<Arc<Services>>,
    Extension(caller): Extension<CallerContext>,
) -> axum::response::Response {
    match services.orders.list_for_user(caller.user_id()).await {
        Ok(orders) => dto::ok(StatusCode::OK, orders),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_my_order(
    Extension(services): Extension<Arc<Services>>,
    Extension(caller): Extension<CallerContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: OrderId = match errors::parse_id(&id, "order") {
        Ok(v) => v,
        Err(res) => return res,
    };
    match services.orders.get_for_user(caller.user_id(), id).await {
        Ok(view) => dto::ok(StatusCode::OK, view),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// Removes the record only; reserved stock is not returned.
pub async fn delete_my_order(
    Extension(services): Extension<Arc<Services>>,
    Extension(caller): Extension<CallerContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: OrderId = match errors::parse_id(&id, "order") {
        Ok(v) => v,
        Err(res) => return res,
    };
    match services.orders.delete_for_user(caller.user_id(), id).await {
        Ok(()) => dto::done("order deleted"),
        Err(e) => errors::service_error_to_response(e),
    }
}
