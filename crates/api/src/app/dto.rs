use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts, Query, Request};
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};
use axum::{Json, async_trait};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;

use gadgetbazar_auth::Role;
use gadgetbazar_catalog::VariationSelector;
use gadgetbazar_core::ProductId;
use gadgetbazar_orders::{OrderStatus, PageRequest};

use crate::app::errors;

// -------------------------
// Extractors
// -------------------------

/// `Json<T>` whose rejection uses the error envelope (400 `VALIDATION_ERROR`).
#[derive(Debug)]
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(json_rejection(rejection)),
        }
    }
}

/// `Query<T>` with the same rejection shape.
#[derive(Debug)]
pub struct QueryParams<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for QueryParams<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Query::<T>::from_request_parts(parts, state).await {
            Ok(Query(value)) => Ok(Self(value)),
            Err(rejection) => Err(query_rejection(rejection)),
        }
    }
}

fn json_rejection(rejection: JsonRejection) -> Response {
    tracing::debug!(error = %rejection.body_text(), "request body rejected");
    errors::json_error(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", rejection.body_text())
}

fn query_rejection(rejection: QueryRejection) -> Response {
    errors::json_error(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", rejection.body_text())
}

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestockProductRequest {
    #[serde(default)]
    pub variation: Option<VariationSelector>,
    pub quantity: u32,
}

#[derive(Debug, Deserialize)]
pub struct ChangePriceRequest {
    pub price: u64,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: OrderStatus,
}

#[derive(Debug, Deserialize)]
pub struct SetRoleRequest {
    pub role: Role,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistRequest {
    pub product_id: ProductId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestockSubscriptionRequest {
    pub product_id: ProductId,
    #[serde(default)]
    pub variation: Option<VariationSelector>,
}

/// `?page=&limit=` with the listing defaults.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl PageQuery {
    pub fn to_request(&self) -> PageRequest {
        let defaults = PageRequest::default();
        PageRequest::new(
            self.page.unwrap_or(defaults.page),
            self.limit.unwrap_or(defaults.limit),
        )
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct OrdersQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub status: Option<OrderStatus>,
}

impl OrdersQuery {
    pub fn to_request(&self) -> PageRequest {
        PageQuery {
            page: self.page,
            limit: self.limit,
        }
        .to_request()
    }
}

// -------------------------
// Response helpers
// -------------------------

/// `{"success": true, "data": …}`
pub fn ok<T: Serialize>(status: StatusCode, data: T) -> Response {
    (
        status,
        axum::Json(json!({
            "success": true,
            "data": data,
        })),
    )
        .into_response()
}

/// `{"success": true, "message": …}` for writes with nothing to return.
pub fn done(message: &str) -> Response {
    (
        StatusCode::OK,
        axum::Json(json!({
            "success": true,
            "message": message,
        })),
    )
        .into_response()
}
