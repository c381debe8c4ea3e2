use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use gadgetbazar_auth::{Role, User, VerifiedIdentity};
use gadgetbazar_core::{DomainError, Resource, UserId};
use gadgetbazar_orders::{Page, PageRequest};

use super::ServiceResult;
use crate::store::Store;

/// Local user records keyed by the identity provider's subject.
#[derive(Clone)]
pub struct UserDirectory {
    store: Arc<dyn Store>,
}

impl UserDirectory {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Resolve a verified token to a user, creating it on first sight.
    pub async fn authenticate(&self, identity: &VerifiedIdentity) -> ServiceResult<User> {
        Ok(self
            .store
            .upsert_user_from_identity(identity, Utc::now())
            .await?)
    }

    pub async fn get(&self, id: UserId) -> ServiceResult<User> {
        self.store
            .get_user(id)
            .await?
            .ok_or_else(|| DomainError::not_found(Resource::User, id).into())
    }

    pub async fn list(&self, page: PageRequest) -> ServiceResult<Page<User>> {
        let page = page.normalized();
        let (items, total) = self.store.list_users(page).await?;
        Ok(Page {
            items,
            pagination: page.info(total),
        })
    }

    pub async fn set_role(&self, id: UserId, role: Role) -> ServiceResult<User> {
        let user = self
            .store
            .set_user_role(id, role)
            .await?
            .ok_or_else(|| DomainError::not_found(Resource::User, id))?;
        info!(user_id = %id, role = %role, "user role changed");
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::services::ServiceError;
    use crate::store::InMemoryStore;
    use gadgetbazar_auth::Issuer;

    fn identity(issuer: Issuer, name: Option<&str>) -> VerifiedIdentity {
        VerifiedIdentity {
            uid: "sub-42".to_string(),
            email: "rafiq@example.com".to_string(),
            name: name.map(str::to_string),
            issuer,
        }
    }

    #[tokio::test]
    async fn first_sight_creates_and_admin_token_promotes_without_demotion() {
        let store = Arc::new(InMemoryStore::new());
        let users = UserDirectory::new(store.clone());

        let created = users
            .authenticate(&identity(Issuer::Customer, Some("Rafiq")))
            .await
            .unwrap();
        assert_eq!(created.role, Role::Customer);

        let promoted = users
            .authenticate(&identity(Issuer::Admin, None))
            .await
            .unwrap();
        assert_eq!(promoted.id, created.id);
        assert_eq!(promoted.role, Role::Admin);

        let again = users
            .authenticate(&identity(Issuer::Customer, None))
            .await
            .unwrap();
        assert_eq!(again.role, Role::Admin);
        assert_eq!(store.list_admins().await.unwrap(), vec![created.id]);
    }

    #[tokio::test]
    async fn set_role_on_unknown_user_is_not_found() {
        let users = UserDirectory::new(Arc::new(InMemoryStore::new()));
        let err = users.set_role(UserId::new(), Role::Admin).await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Domain(DomainError::NotFound { resource: Resource::User, .. })
        ));
    }

    #[tokio::test]
    async fn listing_is_paginated() {
        let store = Arc::new(InMemoryStore::new());
        let users = UserDirectory::new(store.clone());
        for i in 0..3 {
            users
                .authenticate(&VerifiedIdentity {
                    uid: format!("sub-{i}"),
                    email: format!("user{i}@example.com"),
                    name: None,
                    issuer: Issuer::Customer,
                })
                .await
                .unwrap();
        }
        let page = users.list(PageRequest::new(1, 2)).await.unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.pagination.total_items, 3);
        assert_eq!(page.pagination.total_pages, 2);
    }
}
