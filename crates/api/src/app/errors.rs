//! Consistent JSON error responses.
//!
//! Every failure renders as `{"success": false, "error": {"code", "message"}}`.
//! Store and other unexpected failures are logged with their detail and
//! reported to the client only as `INTERNAL_ERROR`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use gadgetbazar_core::{DomainError, Resource};
use gadgetbazar_infra::ServiceError;

pub fn service_error_to_response(err: ServiceError) -> Response {
    match err {
        ServiceError::Domain(e) => domain_error_to_response(e),
        ServiceError::Store(e) => {
            tracing::error!(error = %e, "store failure");
            internal_error()
        }
    }
}

pub fn domain_error_to_response(err: DomainError) -> Response {
    let message = err.to_string();
    match err {
        DomainError::Validation(_) => json_error(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", message),
        DomainError::NotFound { resource, .. } => {
            let code = match resource {
                Resource::Product => "PRODUCT_NOT_FOUND",
                Resource::Order => "ORDER_NOT_FOUND",
                _ => "NOT_FOUND",
            };
            json_error(StatusCode::NOT_FOUND, code, message)
        }
        DomainError::InsufficientStock { .. } => {
            json_error(StatusCode::BAD_REQUEST, "INSUFFICIENT_STOCK", message)
        }
        DomainError::Conflict(_) => json_error(StatusCode::CONFLICT, "CONFLICT", message),
        DomainError::InvariantViolation(_) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "INVARIANT_VIOLATION", message)
        }
    }
}

pub fn internal_error() -> Response {
    json_error(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", "internal error")
}

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "success": false,
            "error": {
                "code": code,
                "message": message.into(),
            },
        })),
    )
        .into_response()
}

/// Parse a path segment into a typed id, or a 400 response.
pub fn parse_id<T: std::str::FromStr>(raw: &str, what: &str) -> Result<T, Response> {
    raw.parse().map_err(|_| {
        json_error(
            StatusCode::BAD_REQUEST,
            "VALIDATION_ERROR",
            format!("invalid {what} id: {raw}"),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use gadgetbazar_core::ProductId;
    use gadgetbazar_infra::StoreError;

    #[test]
    fn domain_errors_map_to_stable_codes() {
        let cases = [
            (DomainError::validation("x"), StatusCode::BAD_REQUEST),
            (
                DomainError::not_found(Resource::Order, "o-1"),
                StatusCode::NOT_FOUND,
            ),
            (
                DomainError::insufficient_stock(ProductId::new(), "Pixel", 2, 1),
                StatusCode::BAD_REQUEST,
            ),
            (DomainError::conflict("dup"), StatusCode::CONFLICT),
            (DomainError::invariant("bad"), StatusCode::UNPROCESSABLE_ENTITY),
        ];
        for (err, status) in cases {
            assert_eq!(domain_error_to_response(err).status(), status);
        }
    }

    #[test]
    fn store_failures_are_opaque_500s() {
        let res = service_error_to_response(ServiceError::Store(StoreError::Backend(
            "connection refused on 10.0.0.5".to_string(),
        )));
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn bad_ids_are_validation_errors() {
        let res = parse_id::<ProductId>("nope", "product").unwrap_err();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }
}
