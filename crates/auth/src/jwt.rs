use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};

use crate::claims::{IdTokenClaims, TokenValidationError, validate_claims};

/// Decodes a bearer token into validated claims for one issuer.
pub trait JwtValidator: Send + Sync {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<IdTokenClaims, TokenValidationError>;
}

/// Shared-secret HS256 validator.
///
/// Time checks are done by [`validate_claims`] against the caller's clock, so
/// the decoder's own `exp` handling is turned off.
pub struct Hs256JwtValidator {
    key: DecodingKey,
    validation: Validation,
}

impl Hs256JwtValidator {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.required_spec_claims.clear();
        Self {
            key: DecodingKey::from_secret(secret.as_ref()),
            validation,
        }
    }
}

impl JwtValidator for Hs256JwtValidator {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<IdTokenClaims, TokenValidationError> {
        let data = jsonwebtoken::decode::<IdTokenClaims>(token, &self.key, &self.validation)
            .map_err(|_| TokenValidationError::InvalidToken)?;
        validate_claims(&data.claims, now)?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use jsonwebtoken::{EncodingKey, Header};

    fn mint(secret: &str, claims: &IdTokenClaims) -> String {
        jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn claims(now: DateTime<Utc>) -> IdTokenClaims {
        IdTokenClaims {
            sub: "uid-42".to_string(),
            email: Some("nadia@example.com".to_string()),
            name: Some("Nadia".to_string()),
            issued_at: now - Duration::seconds(5),
            expires_at: now + Duration::minutes(10),
        }
    }

    #[test]
    fn decodes_token_signed_with_same_secret() {
        let now = Utc::now();
        let token = mint("s3cret", &claims(now));
        let out = Hs256JwtValidator::new("s3cret").validate(&token, now).unwrap();
        assert_eq!(out.sub, "uid-42");
        assert_eq!(out.name.as_deref(), Some("Nadia"));
    }

    #[test]
    fn rejects_foreign_signature_and_garbage() {
        let now = Utc::now();
        let token = mint("other", &claims(now));
        let v = Hs256JwtValidator::new("s3cret");
        assert_eq!(v.validate(&token, now), Err(TokenValidationError::InvalidToken));
        assert_eq!(v.validate("not.a.jwt", now), Err(TokenValidationError::InvalidToken));
    }

    #[test]
    fn rejects_expired_token() {
        let now = Utc::now();
        let token = mint("s3cret", &claims(now));
        let later = now + Duration::hours(1);
        assert_eq!(
            Hs256JwtValidator::new("s3cret").validate(&token, later),
            Err(TokenValidationError::Expired)
        );
    }
}
