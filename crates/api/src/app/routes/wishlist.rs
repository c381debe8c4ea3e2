use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    routing::{delete, get},
    Router,
};

use gadgetbazar_core::ProductId;
use gadgetbazar_infra::Services;

use crate::app::{dto, errors};
use crate::context::CallerContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_wishlist).post(add_to_wishlist))
        .route("/:product_id", delete(remove_from_wishlist))
}

pub async fn list_wishlist(
    Extension(services): Extension<Arc<Services>>,
    Extension(caller): Extension<CallerContext>,
) -> axum::response::Response {
    match services.subscriptions.wishlist(caller.user_id()).await {
        Ok(products) => dto::ok(StatusCode::OK, products),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// 201 on first add, 200 when the product was already wishlisted.
pub async fn add_to_wishlist(
    Extension(services): Extension<Arc<Services>>,
    Extension(caller): Extension<CallerContext>,
    dto::JsonBody(body): dto::JsonBody<dto::WishlistRequest>,
) -> axum::response::Response {
    match services
        .subscriptions
        .add_to_wishlist(caller.user_id(), body.product_id)
        .await
    {
        Ok(true) => dto::ok(StatusCode::CREATED, serde_json::json!({ "productId": body.product_id })),
        Ok(false) => dto::ok(StatusCode::OK, serde_json::json!({ "productId": body.product_id })),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn remove_from_wishlist(
    Extension(services): Extension<Arc<Services>>,
    Extension(caller): Extension<CallerContext>,
    Path(product_id): Path<String>,
) -> axum::response::Response {
    let product_id: ProductId = match errors::parse_id(&product_id, "product") {
        Ok(v) => v,
        Err(res) => return res,
    };
    match services
        .subscriptions
        .remove_from_wishlist(caller.user_id(), product_id)
        .await
    {
        Ok(()) => dto::done("removed from wishlist"),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// `POST /restock-requests`
pub async fn request_restock(
    Extension(services): Extension<Arc<Services>>,
    Extension(caller): Extension<CallerContext>,
    dto::JsonBody(body): dto::JsonBody<dto::RestockSubscriptionRequest>,
) -> axum::response::Response {
    match services
        .subscriptions
        .request_restock(caller.user_id(), body.product_id, body.variation)
        .await
    {
        Ok(request) => dto::ok(StatusCode::CREATED, request),
        Err(e) => errors::service_error_to_response(e),
    }
}
