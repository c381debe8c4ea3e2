//! Catalog domain module.
//!
//! Products, variations and the stock rules that every write path must keep,
//! implemented purely as deterministic domain logic (no IO, no HTTP, no storage).

pub mod change;
pub mod product;
pub mod variation;

pub use change::{ProductChange, Reservation};
pub use product::{
    NewProduct, PriceChange, Product, ProductFilter, ProductPatch, ProductRecord, StockTransition,
};
pub use variation::{Variation, VariationSelector};
