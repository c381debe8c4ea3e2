//! `gadgetbazar-auth`: token verification and the storefront role model.
//!
//! Decoupled from HTTP and storage. The API layer extracts the bearer token,
//! this crate turns it into a [`VerifiedIdentity`], and the user directory
//! reconciles that identity into a [`User`].

pub mod authorize;
pub mod claims;
pub mod jwt;
pub mod roles;
pub mod user;
pub mod verifier;

pub use authorize::{AuthzError, require_admin};
pub use claims::{IdTokenClaims, TokenValidationError, validate_claims};
pub use jwt::{Hs256JwtValidator, JwtValidator};
pub use roles::Role;
pub use user::User;
pub use verifier::{DualIssuerVerifier, Issuer, VerifiedIdentity};
