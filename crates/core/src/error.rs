//! Domain error model.

use thiserror::Error;

use crate::id::ProductId;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Which kind of record a `NotFound` refers to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Resource {
    Product,
    Order,
    User,
    Notification,
    WishlistEntry,
}

impl Resource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::Product => "product",
            Resource::Order => "order",
            Resource::User => "user",
            Resource::Notification => "notification",
            Resource::WishlistEntry => "wishlist entry",
        }
    }
}

impl core::fmt::Display for Resource {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// invariants, stock, conflicts). Infrastructure concerns belong elsewhere.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. malformed input, missing field).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A domain invariant was violated.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// A requested record does not exist.
    #[error("{resource} not found: {id}")]
    NotFound { resource: Resource, id: String },

    /// A reservation asked for more units than are available.
    #[error("insufficient stock for {name} ({product_id}): requested {requested}, available {available}")]
    InsufficientStock {
        product_id: ProductId,
        name: String,
        requested: u32,
        available: u32,
    },

    /// A conflicting record already exists or a concurrent change won.
    #[error("conflict: {0}")]
    Conflict(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn not_found(resource: Resource, id: impl core::fmt::Display) -> Self {
        Self::NotFound {
            resource,
            id: id.to_string(),
        }
    }

    pub fn insufficient_stock(
        product_id: ProductId,
        name: impl Into<String>,
        requested: u32,
        available: u32,
    ) -> Self {
        Self::InsufficientStock {
            product_id,
            name: name.into(),
            requested,
            available,
        }
    }
}
