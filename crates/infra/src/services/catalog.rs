use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument};

use gadgetbazar_catalog::{
    NewProduct, Product, ProductChange, ProductFilter, ProductPatch, VariationSelector,
};
use gadgetbazar_core::{DomainError, ProductId, Resource};

use super::ServiceResult;
use crate::store::{ProductUpdate, Store};

/// Catalog reads and admin edits.
///
/// Every edit goes through [`Store::apply_product_change`], so restock and
/// price-drop fan-out is committed together with the product row.
#[derive(Clone)]
pub struct CatalogAdmin {
    store: Arc<dyn Store>,
}

impl CatalogAdmin {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn get(&self, id: ProductId) -> ServiceResult<Product> {
        self.store
            .get_product(id)
            .await?
            .ok_or_else(|| DomainError::not_found(Resource::Product, id).into())
    }

    pub async fn list(&self, filter: &ProductFilter) -> ServiceResult<Vec<Product>> {
        Ok(self.store.list_products(filter).await?)
    }

    #[instrument(skip(self, new), fields(name = %new.name), err)]
    pub async fn create(&self, new: NewProduct) -> ServiceResult<Product> {
        let product = Product::create(ProductId::new(), new, Utc::now())?;
        self.store.insert_product(&product).await?;
        info!(product_id = %product.id(), stock = product.stock_quantity(), "product created");
        Ok(product)
    }

    pub async fn update(&self, id: ProductId, patch: ProductPatch) -> ServiceResult<ProductUpdate> {
        self.apply(id, ProductChange::Patch(patch)).await
    }

    /// Add `delta` units to the product or one of its variations.
    pub async fn restock(
        &self,
        id: ProductId,
        selector: Option<VariationSelector>,
        delta: u32,
    ) -> ServiceResult<ProductUpdate> {
        self.apply(id, ProductChange::Restock { selector, delta }).await
    }

    pub async fn change_price(&self, id: ProductId, new_price: u64) -> ServiceResult<ProductUpdate> {
        self.apply(id, ProductChange::Price { new_price }).await
    }

    pub async fn delete(&self, id: ProductId) -> ServiceResult<()> {
        if !self.store.delete_product(id).await? {
            return Err(DomainError::not_found(Resource::Product, id).into());
        }
        info!(product_id = %id, "product deleted");
        Ok(())
    }

    #[instrument(skip(self, change), fields(product_id = %id), err)]
    async fn apply(&self, id: ProductId, change: ProductChange) -> ServiceResult<ProductUpdate> {
        let update = self
            .store
            .apply_product_change(id, &change, Utc::now())
            .await?;
        info!(
            product_id = %id,
            stock = update.after.stock_quantity(),
            price = update.after.price(),
            notifications = update.notifications.len(),
            restocked_requests = update.restocked_requests,
            "product updated"
        );
        Ok(update)
    }
}
