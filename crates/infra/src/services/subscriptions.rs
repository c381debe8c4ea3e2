use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use gadgetbazar_catalog::{Product, VariationSelector};
use gadgetbazar_core::{DomainError, ProductId, Resource, UserId};
use gadgetbazar_notifications::{RestockRequest, WishlistEntry};

use super::ServiceResult;
use crate::store::Store;

/// Wishlists and restock requests: the subscriber sets the fan-out reads.
#[derive(Clone)]
pub struct Subscriptions {
    store: Arc<dyn Store>,
}

impl Subscriptions {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Idempotent. Returns false when the product was already wishlisted.
    pub async fn add_to_wishlist(&self, user_id: UserId, product_id: ProductId) -> ServiceResult<bool> {
        self.product(product_id).await?;
        let entry = WishlistEntry {
            user_id,
            product_id,
            created_at: Utc::now(),
        };
        Ok(self.store.add_to_wishlist(&entry).await?)
    }

    pub async fn remove_from_wishlist(&self, user_id: UserId, product_id: ProductId) -> ServiceResult<()> {
        if !self.store.remove_from_wishlist(user_id, product_id).await? {
            return Err(DomainError::not_found(Resource::WishlistEntry, product_id).into());
        }
        Ok(())
    }

    /// Wishlisted products, most recently added first.
    pub async fn wishlist(&self, user_id: UserId) -> ServiceResult<Vec<Product>> {
        let entries = self.store.wishlist_for_user(user_id).await?;
        let ids: Vec<ProductId> = entries.iter().map(|e| e.product_id).collect();
        Ok(self.store.products_by_ids(&ids).await?)
    }

    /// Ask to be told when an unavailable product or variation comes back.
    pub async fn request_restock(
        &self,
        user_id: UserId,
        product_id: ProductId,
        variation: Option<VariationSelector>,
    ) -> ServiceResult<RestockRequest> {
        let product = self.product(product_id).await?;
        let request = RestockRequest::open(user_id, &product, variation, Utc::now())?;
        self.store.insert_restock_request(&request).await?;
        info!(request_id = %request.id, product_id = %product_id, "restock requested");
        Ok(request)
    }

    async fn product(&self, id: ProductId) -> ServiceResult<Product> {
        self.store
            .get_product(id)
            .await?
            .ok_or_else(|| DomainError::not_found(Resource::Product, id).into())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::services::ServiceError;
    use crate::services::test_support::*;
    use crate::store::InMemoryStore;

    #[tokio::test]
    async fn wishlist_is_idempotent_and_requires_the_product() {
        let store = Arc::new(InMemoryStore::new());
        let user = customer(&store, "u").await;
        let p = simple_product(&store, "Drone", 45_000, 1).await;
        let subs = Subscriptions::new(store.clone());

        assert!(subs.add_to_wishlist(user.id, p.id()).await.unwrap());
        assert!(!subs.add_to_wishlist(user.id, p.id()).await.unwrap());
        assert_eq!(subs.wishlist(user.id).await.unwrap().len(), 1);

        let missing = subs.add_to_wishlist(user.id, ProductId::new()).await.unwrap_err();
        assert!(matches!(
            missing,
            ServiceError::Domain(DomainError::NotFound { resource: Resource::Product, .. })
        ));

        subs.remove_from_wishlist(user.id, p.id()).await.unwrap();
        assert!(subs.wishlist(user.id).await.unwrap().is_empty());
        assert!(subs.remove_from_wishlist(user.id, p.id()).await.is_err());
    }

    #[tokio::test]
    async fn restock_requests_only_for_unavailable_stock() {
        let store = Arc::new(InMemoryStore::new());
        let user = customer(&store, "u").await;
        let available = simple_product(&store, "Gimbal", 12_000, 2).await;
        let sold_out = simple_product(&store, "Action Cam", 38_000, 0).await;
        let subs = Subscriptions::new(store.clone());

        let err = subs
            .request_restock(user.id, available.id(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::Validation(_))));

        let request = subs.request_restock(user.id, sold_out.id(), None).await.unwrap();
        assert!(request.is_pending());
        assert_eq!(
            store.restock_requests_for_product(sold_out.id()).await.unwrap(),
            vec![request]
        );
    }
}
