//! Application services: orchestration over the [`Store`].
//!
//! Each service owns a shared `Arc<dyn Store>` and composes pure domain logic
//! (pricing, patches, fan-out planning) with the store's atomic units. Nothing
//! here holds state of its own, so services are cheap to clone into handlers.
//!
//! ## Order placement
//!
//! ```text
//! PlaceOrder
//!   ↓
//! 1. Shape validation and merging of repeated lines (no IO)
//!   ↓
//! 2. Read-only pricing pass against the current catalog
//!   ↓
//! 3. Store::commit_order (reservations + order + admin notifications, all or nothing)
//!   ↓
//! 4. Clear the cart (best effort)
//! ```

use std::sync::Arc;

use thiserror::Error;

use gadgetbazar_core::DomainError;

use crate::config::{AppConfig, StoreConfig};
use crate::store::{InMemoryStore, PostgresStore, Store, StoreError, StoreResult};

pub mod carts;
pub mod catalog;
pub mod dashboard;
pub mod inbox;
pub mod orders;
pub mod subscriptions;
pub mod users;

#[cfg(test)]
mod test_support;

pub use carts::Carts;
pub use catalog::CatalogAdmin;
pub use dashboard::{Dashboard, DashboardStats};
pub use inbox::NotificationInbox;
pub use orders::{OrderView, OrderWorkflow, ProductSummary};
pub use subscriptions::Subscriptions;
pub use users::UserDirectory;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for ServiceError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Domain(e) => ServiceError::Domain(e),
            other => ServiceError::Store(other),
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Every service, sharing one store.
#[derive(Clone)]
pub struct Services {
    pub orders: OrderWorkflow,
    pub catalog: CatalogAdmin,
    pub inbox: NotificationInbox,
    pub subscriptions: Subscriptions,
    pub carts: Carts,
    pub users: UserDirectory,
    pub dashboard: Dashboard,
}

impl Services {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            orders: OrderWorkflow::new(store.clone()),
            catalog: CatalogAdmin::new(store.clone()),
            inbox: NotificationInbox::new(store.clone()),
            subscriptions: Subscriptions::new(store.clone()),
            carts: Carts::new(store.clone()),
            users: UserDirectory::new(store.clone()),
            dashboard: Dashboard::new(store),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryStore::new()))
    }
}

/// Open the store selected by configuration. Postgres is migrated before use.
pub async fn build_store(config: &AppConfig) -> StoreResult<Arc<dyn Store>> {
    match &config.store {
        StoreConfig::InMemory => {
            tracing::info!("using in-memory store");
            Ok(Arc::new(InMemoryStore::new()))
        }
        StoreConfig::Postgres {
            database_url,
            max_connections,
        } => {
            tracing::info!(max_connections, "using postgres store");
            let store = PostgresStore::connect(database_url, *max_connections).await?;
            store.migrate().await?;
            Ok(Arc::new(store))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gadgetbazar_core::{ProductId, Resource};

    #[test]
    fn store_domain_errors_surface_as_domain_errors() {
        let err: ServiceError =
            StoreError::Domain(DomainError::not_found(Resource::Product, ProductId::new())).into();
        assert!(matches!(err, ServiceError::Domain(DomainError::NotFound { .. })));

        let err: ServiceError = StoreError::Backend("down".to_string()).into();
        assert!(matches!(err, ServiceError::Store(StoreError::Backend(_))));
    }
}
