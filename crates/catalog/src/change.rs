//! Administrative product mutations as data, so a store can apply them inside
//! its own transaction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use gadgetbazar_core::{DomainResult, ProductId};

use crate::product::{Product, ProductPatch};
use crate::variation::VariationSelector;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProductChange {
    Restock {
        #[serde(default)]
        selector: Option<VariationSelector>,
        delta: u32,
    },
    Price {
        new_price: u64,
    },
    Patch(ProductPatch),
}

impl ProductChange {
    pub fn apply(&self, product: &mut Product, now: DateTime<Utc>) -> DomainResult<()> {
        match self {
            ProductChange::Restock { selector, delta } => {
                product.restock(selector.as_ref(), *delta, now)?;
            }
            ProductChange::Price { new_price } => {
                product.change_price(*new_price, now)?;
            }
            ProductChange::Patch(patch) => product.apply_patch(patch, now)?,
        }
        Ok(())
    }
}

/// One order line's claim on stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub product_id: ProductId,
    pub selector: Option<VariationSelector>,
    pub quantity: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::product::NewProduct;
    use gadgetbazar_core::DomainError;

    fn product(stock: u32) -> Product {
        Product::create(
            ProductId::new(),
            NewProduct {
                name: "USB-C Charger".to_string(),
                brand: None,
                description: None,
                price: 1200,
                original_price: None,
                stock_quantity: stock,
                variations: vec![],
            },
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn restock_change_applies_delta() {
        let mut p = product(0);
        ProductChange::Restock { selector: None, delta: 3 }
            .apply(&mut p, Utc::now())
            .unwrap();
        assert_eq!(p.stock_quantity(), 3);
        assert!(p.in_stock());
    }

    #[test]
    fn price_change_rejects_zero() {
        let mut p = product(1);
        let err = ProductChange::Price { new_price: 0 }
            .apply(&mut p, Utc::now())
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert_eq!(p.price(), 1200);
    }

    #[test]
    fn change_deserializes_from_tagged_json() {
        let change: ProductChange =
            serde_json::from_str(r#"{"kind":"restock","delta":4}"#).unwrap();
        assert_eq!(change, ProductChange::Restock { selector: None, delta: 4 });
    }
}
