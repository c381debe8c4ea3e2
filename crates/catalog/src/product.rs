use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use gadgetbazar_core::{DomainError, DomainResult, ProductId};

use crate::variation::{Variation, VariationSelector};

/// Input for creating a product (admin).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub name: String,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub price: u64,
    #[serde(default)]
    pub original_price: Option<u64>,
    /// Ignored when `variations` is non-empty (the aggregate is derived).
    #[serde(default)]
    pub stock_quantity: u32,
    #[serde(default)]
    pub variations: Vec<Variation>,
}

/// Persistence shape of a product.
///
/// Storage backends load this and go through [`Product::rehydrate`], which
/// re-checks the stock invariants instead of trusting the row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRecord {
    pub id: ProductId,
    pub name: String,
    pub brand: Option<String>,
    pub description: Option<String>,
    pub price: u64,
    pub original_price: Option<u64>,
    pub stock_quantity: u32,
    pub in_stock: bool,
    pub variations: Vec<Variation>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A catalog product.
///
/// Invariants (hold after every constructor and mutation):
/// - `in_stock == (stock_quantity > 0)`
/// - with variations, `stock_quantity == Σ variation.stock`
/// - variation selectors are unique
/// - `price > 0`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    id: ProductId,
    name: String,
    brand: Option<String>,
    description: Option<String>,
    price: u64,
    original_price: Option<u64>,
    stock_quantity: u32,
    in_stock: bool,
    variations: Vec<Variation>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Product {
    pub fn create(id: ProductId, new: NewProduct, now: DateTime<Utc>) -> DomainResult<Self> {
        let mut product = Self {
            id,
            name: new.name.trim().to_string(),
            brand: new.brand,
            description: new.description,
            price: new.price,
            original_price: new.original_price,
            stock_quantity: new.stock_quantity,
            in_stock: false,
            variations: new.variations,
            created_at: now,
            updated_at: now,
        };
        product.validate_attributes()?;
        product.recompute_stock()?;
        Ok(product)
    }

    /// Rebuild a product from storage, rejecting rows that break the invariants.
    pub fn rehydrate(record: ProductRecord) -> DomainResult<Self> {
        let product = Self {
            id: record.id,
            name: record.name,
            brand: record.brand,
            description: record.description,
            price: record.price,
            original_price: record.original_price,
            stock_quantity: record.stock_quantity,
            in_stock: record.in_stock,
            variations: record.variations,
            created_at: record.created_at,
            updated_at: record.updated_at,
        };
        product.validate_attributes()?;

        if product.in_stock != (product.stock_quantity > 0) {
            return Err(DomainError::invariant(format!(
                "product {} has in_stock={} with stock_quantity={}",
                product.id, product.in_stock, product.stock_quantity
            )));
        }
        if product.has_variations() && product.variation_total()? != product.stock_quantity {
            return Err(DomainError::invariant(format!(
                "product {} stock_quantity does not match its variations",
                product.id
            )));
        }
        Ok(product)
    }

    pub fn to_record(&self) -> ProductRecord {
        ProductRecord {
            id: self.id,
            name: self.name.clone(),
            brand: self.brand.clone(),
            description: self.description.clone(),
            price: self.price,
            original_price: self.original_price,
            stock_quantity: self.stock_quantity,
            in_stock: self.in_stock,
            variations: self.variations.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    pub fn id(&self) -> ProductId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn brand(&self) -> Option<&str> {
        self.brand.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn price(&self) -> u64 {
        self.price
    }

    pub fn original_price(&self) -> Option<u64> {
        self.original_price
    }

    pub fn stock_quantity(&self) -> u32 {
        self.stock_quantity
    }

    pub fn in_stock(&self) -> bool {
        self.in_stock
    }

    pub fn variations(&self) -> &[Variation] {
        &self.variations
    }

    pub fn has_variations(&self) -> bool {
        !self.variations.is_empty()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn variation(&self, selector: &VariationSelector) -> Option<&Variation> {
        self.variations.iter().find(|v| &v.selector == selector)
    }

    /// Units available for the given selector.
    ///
    /// A product with variations must be addressed through a selector; a
    /// product without variations must not be.
    pub fn available(&self, selector: Option<&VariationSelector>) -> DomainResult<u32> {
        match selector {
            Some(sel) => self
                .variation(sel)
                .map(|v| v.stock)
                .ok_or_else(|| self.unknown_variation(sel)),
            None if self.has_variations() => Err(DomainError::validation(format!(
                "product {} has variations; a variation must be selected",
                self.name
            ))),
            None => Ok(self.stock_quantity),
        }
    }

    /// Effective unit price: the variation override if any, else the product price.
    pub fn unit_price(&self, selector: Option<&VariationSelector>) -> DomainResult<u64> {
        match selector {
            Some(sel) => {
                let v = self.variation(sel).ok_or_else(|| self.unknown_variation(sel))?;
                Ok(v.price.unwrap_or(self.price))
            }
            None => Ok(self.price),
        }
    }

    /// Read-only reservation check (no mutation).
    pub fn check_reservation(
        &self,
        selector: Option<&VariationSelector>,
        quantity: u32,
    ) -> DomainResult<()> {
        if quantity == 0 {
            return Err(DomainError::validation("quantity must be at least 1"));
        }
        let available = self.available(selector)?;
        if !self.in_stock || quantity > available {
            return Err(DomainError::insufficient_stock(
                self.id,
                self.name.clone(),
                quantity,
                if self.in_stock { available } else { 0 },
            ));
        }
        Ok(())
    }

    /// Decrement stock for one order line.
    pub fn reserve(
        &mut self,
        selector: Option<&VariationSelector>,
        quantity: u32,
        now: DateTime<Utc>,
    ) -> DomainResult<()> {
        self.check_reservation(selector, quantity)?;

        match selector {
            Some(sel) => {
                let v = self
                    .variations
                    .iter_mut()
                    .find(|v| &v.selector == sel)
                    .ok_or_else(|| DomainError::invariant("variation vanished during reservation"))?;
                v.stock -= quantity;
            }
            None => self.stock_quantity -= quantity,
        }

        self.recompute_stock()?;
        self.updated_at = now;
        Ok(())
    }

    /// Add stock (admin restock). Returns the in-stock transition.
    pub fn restock(
        &mut self,
        selector: Option<&VariationSelector>,
        delta: u32,
        now: DateTime<Utc>,
    ) -> DomainResult<StockTransition> {
        if delta == 0 {
            return Err(DomainError::validation("restock delta must be positive"));
        }
        let was_in_stock = self.in_stock;

        match selector {
            Some(sel) => {
                let unknown = self.unknown_variation(sel);
                let v = self
                    .variations
                    .iter_mut()
                    .find(|v| &v.selector == sel)
                    .ok_or(unknown)?;
                v.stock = v
                    .stock
                    .checked_add(delta)
                    .ok_or_else(|| DomainError::validation("stock overflow"))?;
            }
            None if self.has_variations() => {
                return Err(DomainError::validation(
                    "product has variations; restock a specific variation",
                ));
            }
            None => {
                self.stock_quantity = self
                    .stock_quantity
                    .checked_add(delta)
                    .ok_or_else(|| DomainError::validation("stock overflow"))?;
            }
        }

        self.recompute_stock()?;
        self.updated_at = now;
        Ok(StockTransition {
            was_in_stock,
            now_in_stock: self.in_stock,
        })
    }

    /// Set a new unit price. Returns the old and new price.
    pub fn change_price(&mut self, new_price: u64, now: DateTime<Utc>) -> DomainResult<PriceChange> {
        if new_price == 0 {
            return Err(DomainError::validation("price must be positive"));
        }
        let old_price = self.price;
        self.price = new_price;
        self.updated_at = now;
        Ok(PriceChange {
            old_price,
            new_price,
        })
    }

    /// Apply a general admin edit.
    pub fn apply_patch(&mut self, patch: &ProductPatch, now: DateTime<Utc>) -> DomainResult<()> {
        let mut next = self.clone();

        if let Some(name) = &patch.name {
            next.name = name.trim().to_string();
        }
        if let Some(brand) = &patch.brand {
            next.brand = Some(brand.clone());
        }
        if let Some(description) = &patch.description {
            next.description = Some(description.clone());
        }
        if let Some(price) = patch.price {
            next.change_price(price, now)?;
        }
        if let Some(original) = patch.original_price {
            next.original_price = Some(original);
        }
        if let Some(variations) = &patch.variations {
            next.variations = variations.clone();
        }
        if let Some(stock) = patch.stock_quantity {
            if next.has_variations() {
                return Err(DomainError::validation(
                    "stockQuantity is derived from variations and cannot be set directly",
                ));
            }
            next.stock_quantity = stock;
        }

        next.validate_attributes()?;
        next.recompute_stock()?;
        next.updated_at = now;
        *self = next;
        Ok(())
    }

    pub fn matches(&self, filter: &ProductFilter) -> bool {
        if filter.in_stock_only && !self.in_stock {
            return false;
        }
        match &filter.search {
            Some(q) if !q.trim().is_empty() => {
                let q = q.trim().to_lowercase();
                self.name.to_lowercase().contains(&q)
                    || self
                        .brand
                        .as_deref()
                        .is_some_and(|b| b.to_lowercase().contains(&q))
            }
            _ => true,
        }
    }

    fn validate_attributes(&self) -> DomainResult<()> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        if self.price == 0 {
            return Err(DomainError::validation("price must be positive"));
        }
        for (idx, v) in self.variations.iter().enumerate() {
            if v.selector.color.trim().is_empty() {
                return Err(DomainError::validation(format!(
                    "variation {idx} is missing a color"
                )));
            }
            if v.price == Some(0) {
                return Err(DomainError::validation(format!(
                    "variation {idx} price must be positive"
                )));
            }
            if self.variations[..idx].iter().any(|o| o.selector == v.selector) {
                return Err(DomainError::validation(format!(
                    "duplicate variation: {}",
                    v.selector
                )));
            }
        }
        Ok(())
    }

    fn variation_total(&self) -> DomainResult<u32> {
        self.variations
            .iter()
            .try_fold(0u32, |acc, v| acc.checked_add(v.stock))
            .ok_or_else(|| DomainError::validation("total variation stock overflows"))
    }

    fn recompute_stock(&mut self) -> DomainResult<()> {
        if self.has_variations() {
            self.stock_quantity = self.variation_total()?;
        }
        self.in_stock = self.stock_quantity > 0;
        Ok(())
    }

    fn unknown_variation(&self, selector: &VariationSelector) -> DomainError {
        DomainError::validation(format!(
            "unknown variation {} for product {}",
            selector, self.name
        ))
    }
}

/// Partial admin edit. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub price: Option<u64>,
    #[serde(default)]
    pub original_price: Option<u64>,
    #[serde(default)]
    pub stock_quantity: Option<u32>,
    #[serde(default)]
    pub variations: Option<Vec<Variation>>,
}

/// Catalog listing filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductFilter {
    #[serde(default)]
    pub in_stock_only: bool,
    #[serde(default)]
    pub search: Option<String>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct StockTransition {
    pub was_in_stock: bool,
    pub now_in_stock: bool,
}

impl StockTransition {
    /// Out-of-stock → in-stock edge.
    pub fn came_back_in_stock(&self) -> bool {
        !self.was_in_stock && self.now_in_stock
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PriceChange {
    pub old_price: u64,
    pub new_price: u64,
}

impl PriceChange {
    pub fn is_drop(&self) -> bool {
        self.new_price < self.old_price
    }
}
