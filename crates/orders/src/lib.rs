//! Orders domain module.
//!
//! This crate contains business rules for customer orders: request validation,
//! price resolution into frozen line snapshots, totals, and the status
//! lifecycle. Deterministic domain logic only (no IO, no HTTP, no storage).

pub mod listing;
pub mod order;

pub use listing::{Page, PageInfo, PageRequest};
pub use order::{
    Order, OrderItem, OrderLine, OrderStatus, PaymentMethod, PlaceOrder, SimpleLine,
    StatusChange, VariationLine,
};
