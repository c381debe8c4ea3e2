use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use chrono::Utc;

use gadgetbazar_auth::DualIssuerVerifier;
use gadgetbazar_infra::services::UserDirectory;

use crate::app::errors;
use crate::context::CallerContext;

#[derive(Clone)]
pub struct AuthState {
    pub verifier: DualIssuerVerifier,
    pub users: UserDirectory,
}

/// Verify the bearer token, then upsert the caller into the user directory.
pub async fn auth_middleware(State(state): State<AuthState>, mut req: Request, next: Next) -> Response {
    let Some(token) = extract_bearer(req.headers()) else {
        return unauthorized("missing bearer token");
    };

    let identity = match state.verifier.verify(token, Utc::now()) {
        Ok(identity) => identity,
        Err(e) => {
            tracing::debug!(error = %e, "bearer token rejected");
            return unauthorized("invalid or expired token");
        }
    };

    let user = match state.users.authenticate(&identity).await {
        Ok(user) => user,
        Err(e) => return errors::service_error_to_response(e),
    };

    req.extensions_mut().insert(CallerContext::new(user));
    next.run(req).await
}

fn unauthorized(message: &str) -> Response {
    errors::json_error(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", message)
}

fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let header = headers.get(axum::http::header::AUTHORIZATION)?;
    let header = header.to_str().ok()?;
    let token = header.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        return None;
    }
    Some(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(axum::http::header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        h
    }

    #[test]
    fn bearer_extraction() {
        assert_eq!(extract_bearer(&headers("Bearer abc.def")), Some("abc.def"));
        assert_eq!(extract_bearer(&headers("Bearer   ")), None);
        assert_eq!(extract_bearer(&headers("Basic abc")), None);
        assert_eq!(extract_bearer(&HeaderMap::new()), None);
    }
}
