use std::sync::Arc;

use gadgetbazar_core::{DomainError, Resource, UserId};

use super::ServiceResult;
use crate::store::{CartItem, Store};

#[derive(Clone)]
pub struct Carts {
    store: Arc<dyn Store>,
}

impl Carts {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Add an item. Stock is not reserved until the order is placed.
    pub async fn add(&self, user_id: UserId, item: CartItem) -> ServiceResult<Vec<CartItem>> {
        if item.quantity == 0 {
            return Err(DomainError::validation("quantity must be at least 1").into());
        }
        let product = self
            .store
            .get_product(item.product_id)
            .await?
            .ok_or_else(|| DomainError::not_found(Resource::Product, item.product_id))?;
        // Rejects unknown variations and selector/no-selector mismatches.
        product.available(item.variation.as_ref())?;

        self.store.add_cart_item(user_id, &item).await?;
        self.items(user_id).await
    }

    pub async fn items(&self, user_id: UserId) -> ServiceResult<Vec<CartItem>> {
        Ok(self.store.cart_items(user_id).await?)
    }

    pub async fn clear(&self, user_id: UserId) -> ServiceResult<()> {
        Ok(self.store.clear_cart(user_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::services::ServiceError;
    use crate::services::test_support::*;
    use crate::store::InMemoryStore;
    use gadgetbazar_catalog::{Variation, VariationSelector};

    #[tokio::test]
    async fn adding_the_same_line_twice_sums_quantities() {
        let store = Arc::new(InMemoryStore::new());
        let user = customer(&store, "u").await;
        let p = simple_product(&store, "SSD", 9000, 5).await;
        let carts = Carts::new(store.clone());
        let line = CartItem {
            product_id: p.id(),
            variation: None,
            quantity: 2,
        };

        carts.add(user.id, line.clone()).await.unwrap();
        let items = carts.add(user.id, line).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity, 4);

        carts.clear(user.id).await.unwrap();
        assert!(carts.items(user.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn variation_products_need_a_known_selector() {
        let store = Arc::new(InMemoryStore::new());
        let user = customer(&store, "u").await;
        let p = variation_product(
            &store,
            "Phone Case",
            700,
            vec![Variation::new(VariationSelector::color("Red"), 3)],
        )
        .await;
        let carts = Carts::new(store.clone());

        let err = carts
            .add(
                user.id,
                CartItem {
                    product_id: p.id(),
                    variation: None,
                    quantity: 1,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::Validation(_))));

        let err = carts
            .add(
                user.id,
                CartItem {
                    product_id: p.id(),
                    variation: Some(VariationSelector::color("Blue")),
                    quantity: 1,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::Validation(_))));
    }
}
