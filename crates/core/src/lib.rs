//! `gadgetbazar-core`: ids and the shared domain error.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod error;
pub mod id;

pub use error::{DomainError, DomainResult, Resource};
pub use id::{NotificationId, OrderId, ProductId, RestockRequestId, UserId};
