//! HTTP application wiring.
//!
//! - `routes/`: handlers, one file per area
//! - `dto.rs`: request bodies, query strings, the success envelope
//! - `errors.rs`: the error envelope and error-to-status mapping

use std::sync::Arc;

use axum::{Extension, Router};
use tower::ServiceBuilder;

use gadgetbazar_auth::{DualIssuerVerifier, Hs256JwtValidator, JwtValidator};
use gadgetbazar_infra::{AppConfig, Services};

use crate::{authz, middleware};

pub mod dto;
pub mod errors;
pub mod routes;

/// Build the full HTTP router around an already-wired set of services.
pub fn build_app(services: Services, verifier: DualIssuerVerifier) -> Router {
    let auth_state = middleware::AuthState {
        verifier,
        users: services.users.clone(),
    };
    let services = Arc::new(services);

    let admin = routes::admin::router().layer(axum::middleware::from_fn(authz::admin_only));

    // Protected routes: the auth layer runs before the admin gate.
    let protected = routes::router()
        .nest("/admin", admin)
        .layer(Extension(services.clone()))
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            middleware::auth_middleware,
        ));

    Router::new()
        .merge(routes::public_router().layer(Extension(services)))
        .merge(protected)
        .layer(ServiceBuilder::new())
}

/// One HS256 validator per issuer, from the configured secrets.
pub fn verifier_from_config(config: &AppConfig) -> DualIssuerVerifier {
    let admin: Arc<dyn JwtValidator> = Arc::new(Hs256JwtValidator::new(&config.admin_jwt_secret));
    let customer: Arc<dyn JwtValidator> = Arc::new(Hs256JwtValidator::new(&config.user_jwt_secret));
    DualIssuerVerifier::new(Some(admin), Some(customer))
}
