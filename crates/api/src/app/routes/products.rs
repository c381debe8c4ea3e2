use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    routing::get,
    Router,
};

use gadgetbazar_catalog::ProductFilter;
use gadgetbazar_core::ProductId;
use gadgetbazar_infra::Services;

use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_products))
        .route("/:id", get(get_product))
}

/// Public catalog listing, newest first. `?inStockOnly=true&search=…`
pub async fn list_products(
    Extension(services): Extension<Arc<Services>>,
    dto::QueryParams(filter): dto::QueryParams<ProductFilter>,
) -> axum::response::Response {
    match services.catalog.list(&filter).await {
        Ok(products) => dto::ok(StatusCode::OK, products),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_product(
    Extension(services): Extension<Arc<Services>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: ProductId = match errors::parse_id(&id, "product") {
        Ok(v) => v,
        Err(res) => return res,
    };
    match services.catalog.get(id).await {
        Ok(product) => dto::ok(StatusCode::OK, product),
        Err(e) => errors::service_error_to_response(e),
    }
}
