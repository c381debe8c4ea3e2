use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::claims::TokenValidationError;
use crate::jwt::JwtValidator;

/// Which identity project accepted the token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Issuer {
    Admin,
    Customer,
}

/// Caller identity after signature and claim checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedIdentity {
    pub uid: String,
    pub email: String,
    pub name: Option<String>,
    pub issuer: Issuer,
}

impl VerifiedIdentity {
    pub fn is_admin_auth(&self) -> bool {
        self.issuer == Issuer::Admin
    }

    /// Name to show for a new user: token name, else the email's local part.
    pub fn default_display_name(&self) -> String {
        match self.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => self
                .email
                .split('@')
                .next()
                .unwrap_or_default()
                .to_string(),
        }
    }
}

/// Tries the admin issuer first, then the customer issuer.
///
/// Either issuer may be absent; a token is rejected only when every configured
/// issuer rejects it.
#[derive(Clone, Default)]
pub struct DualIssuerVerifier {
    admin: Option<Arc<dyn JwtValidator>>,
    customer: Option<Arc<dyn JwtValidator>>,
}

impl DualIssuerVerifier {
    pub fn new(admin: Option<Arc<dyn JwtValidator>>, customer: Option<Arc<dyn JwtValidator>>) -> Self {
        Self { admin, customer }
    }

    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<VerifiedIdentity, TokenValidationError> {
        let mut last_err = TokenValidationError::NoIssuer;

        for (issuer, validator) in [
            (Issuer::Admin, self.admin.as_ref()),
            (Issuer::Customer, self.customer.as_ref()),
        ] {
            let Some(validator) = validator else { continue };
            match validator.validate(token, now) {
                Ok(claims) => {
                    let email = claims
                        .email
                        .filter(|e| !e.trim().is_empty())
                        .ok_or(TokenValidationError::MissingClaim("email"))?;
                    return Ok(VerifiedIdentity {
                        uid: claims.sub,
                        email,
                        name: claims.name,
                        issuer,
                    });
                }
                Err(e) => {
                    debug!(?issuer, error = %e, "token rejected by issuer");
                    last_err = e;
                }
            }
        }

        Err(last_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claims::IdTokenClaims;
    use crate::jwt::Hs256JwtValidator;
    use chrono::Duration;
    use jsonwebtoken::{Algorithm, EncodingKey, Header};

    fn mint(secret: &str, email: Option<&str>) -> String {
        let now = Utc::now();
        let claims = IdTokenClaims {
            sub: "uid-7".to_string(),
            email: email.map(str::to_string),
            name: None,
            issued_at: now - Duration::seconds(5),
            expires_at: now + Duration::minutes(10),
        };
        jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn verifier() -> DualIssuerVerifier {
        DualIssuerVerifier::new(
            Some(Arc::new(Hs256JwtValidator::new("admin-secret"))),
            Some(Arc::new(Hs256JwtValidator::new("user-secret"))),
        )
    }

    #[test]
    fn admin_issuer_marks_identity_as_admin() {
        let id = verifier()
            .verify(&mint("admin-secret", Some("boss@example.com")), Utc::now())
            .unwrap();
        assert_eq!(id.issuer, Issuer::Admin);
        assert!(id.is_admin_auth());
    }

    #[test]
    fn falls_back_to_customer_issuer() {
        let id = verifier()
            .verify(&mint("user-secret", Some("shopper@example.com")), Utc::now())
            .unwrap();
        assert_eq!(id.issuer, Issuer::Customer);
        assert_eq!(id.default_display_name(), "shopper");
    }

    #[test]
    fn rejects_unknown_signer_and_missing_email() {
        let v = verifier();
        assert_eq!(
            v.verify(&mint("nope", Some("x@example.com")), Utc::now()),
            Err(TokenValidationError::InvalidToken)
        );
        assert_eq!(
            v.verify(&mint("user-secret", None), Utc::now()),
            Err(TokenValidationError::MissingClaim("email"))
        );
    }

    #[test]
    fn no_configured_issuer_rejects_everything() {
        assert_eq!(
            DualIssuerVerifier::default().verify("abc", Utc::now()),
            Err(TokenValidationError::NoIssuer)
        );
    }
}
