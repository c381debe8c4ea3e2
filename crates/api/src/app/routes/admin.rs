//! Admin-only endpoints. Mounted under `/admin` behind the role gate.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    routing::{get, post, put},
    Router,
};

use gadgetbazar_catalog::{NewProduct, ProductPatch};
use gadgetbazar_core::{OrderId, ProductId, UserId};
use gadgetbazar_infra::{store::ProductUpdate, Services};

use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/stats", get(stats))
        .route("/products", post(create_product))
        .route("/products/:id", put(update_product).delete(delete_product))
        .route("/products/:id/restock", post(restock_product))
        .route("/products/:id/price", put(change_price))
        .route("/orders", get(list_orders))
        .route("/orders/:id", axum::routing::delete(delete_order))
        .route("/orders/:id/status", put(update_order_status))
        .route("/users", get(list_users))
        .route("/users/:id/role", put(set_user_role))
}

pub async fn stats(Extension(services): Extension<Arc<Services>>) -> axum::response::Response {
    match services.dashboard.stats().await {
        Ok(stats) => dto::ok(StatusCode::OK, stats),
        Err(e) => errors::service_error_to_response(e),
    }
}

// -------------------------
// Products
// -------------------------

pub async fn create_product(
    Extension(services): Extension<Arc<Services>>,
    dto::JsonBody(body): dto::JsonBody<NewProduct>,
) -> axum::response::Response {
    match services.catalog.create(body).await {
        Ok(product) => dto::ok(StatusCode::CREATED, product),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn update_product(
    Extension(services): Extension<Arc<Services>>,
    Path(id): Path<String>,
    dto::JsonBody(body): dto::JsonBody<ProductPatch>,
) -> axum::response::Response {
    let id: ProductId = match errors::parse_id(&id, "product") {
        Ok(v) => v,
        Err(res) => return res,
    };
    match services.catalog.update(id, body).await {
        Ok(update) => product_update(update),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn restock_product(
    Extension(services): Extension<Arc<Services>>,
    Path(id): Path<String>,
    dto::JsonBody(body): dto::JsonBody<dto::RestockProductRequest>,
) -> axum::response::Response {
    let id: ProductId = match errors::parse_id(&id, "product") {
        Ok(v) => v,
        Err(res) => return res,
    };
    match services.catalog.restock(id, body.variation, body.quantity).await {
        Ok(update) => product_update(update),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn change_price(
    Extension(services): Extension<Arc<Services>>,
    Path(id): Path<String>,
    dto::JsonBody(body): dto::JsonBody<dto::ChangePriceRequest>,
) -> axum::response::Response {
    let id: ProductId = match errors::parse_id(&id, "product") {
        Ok(v) => v,
        Err(res) => return res,
    };
    match services.catalog.change_price(id, body.price).await {
        Ok(update) => product_update(update),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn delete_product(
    Extension(services): Extension<Arc<Services>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: ProductId = match errors::parse_id(&id, "product") {
        Ok(v) => v,
        Err(res) => return res,
    };
    match services.catalog.delete(id).await {
        Ok(()) => dto::done("product deleted"),
        Err(e) => errors::service_error_to_response(e),
    }
}

fn product_update(update: ProductUpdate) -> axum::response::Response {
    dto::ok(
        StatusCode::OK,
        serde_json::json!({
            "product": update.after,
            "notificationsSent": update.notifications.len(),
            "restockRequestsFulfilled": update.restocked_requests,
        }),
    )
}

// -------------------------
// Orders
// -------------------------

/// `?page=&limit=&status=`
pub async fn list_orders(
    Extension(services): Extension<Arc<Services>>,
    dto::QueryParams(query): dto::QueryParams<dto::OrdersQuery>,
) -> axum::response::Response {
    match services.orders.list(query.to_request(), query.status).await {
        Ok(page) => dto::ok(StatusCode::OK, page),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn update_order_status(
    Extension(services): Extension<Arc<Services>>,
    Path(id): Path<String>,
    dto::JsonBody(body): dto::JsonBody<dto::UpdateStatusRequest>,
) -> axum::response::Response {
    let id: OrderId = match errors::parse_id(&id, "order") {
        Ok(v) => v,
        Err(res) => return res,
    };
    match services.orders.update_status(id, body.status).await {
        Ok(order) => dto::ok(StatusCode::OK, order),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn delete_order(
    Extension(services): Extension<Arc<Services>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: OrderId = match errors::parse_id(&id, "order") {
        Ok(v) => v,
        Err(res) => return res,
    };
    match services.orders.delete(id).await {
        Ok(()) => dto::done("order deleted"),
        Err(e) => errors::service_error_to_response(e),
    }
}

// -------------------------
// Users
// -------------------------

pub async fn list_users(
    Extension(services): Extension<Arc<Services>>,
    dto::QueryParams(query): dto::QueryParams<dto::PageQuery>,
) -> axum::response::Response {
    match services.users.list(query.to_request()).await {
        Ok(page) => dto::ok(StatusCode::OK, page),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn set_user_role(
    Extension(services): Extension<Arc<Services>>,
    Path(id): Path<String>,
    dto::JsonBody(body): dto::JsonBody<dto::SetRoleRequest>,
) -> axum::response::Response {
    let id: UserId = match errors::parse_id(&id, "user") {
        Ok(v) => v,
        Err(res) => return res,
    };
    match services.users.set_role(id, body.role).await {
        Ok(user) => dto::ok(StatusCode::OK, user),
        Err(e) => errors::service_error_to_response(e),
    }
}
