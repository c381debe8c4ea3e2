use std::sync::Arc;

use gadgetbazar_core::{DomainError, NotificationId, Resource, UserId};
use gadgetbazar_notifications::Notification;

use super::ServiceResult;
use crate::store::Store;

/// A user's notifications. Users only ever see and mark their own.
#[derive(Clone)]
pub struct NotificationInbox {
    store: Arc<dyn Store>,
}

impl NotificationInbox {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn list(&self, user_id: UserId) -> ServiceResult<Vec<Notification>> {
        Ok(self.store.notifications_for_user(user_id).await?)
    }

    pub async fn unread_count(&self, user_id: UserId) -> ServiceResult<u64> {
        Ok(self.store.unread_count(user_id).await?)
    }

    pub async fn mark_read(&self, user_id: UserId, id: NotificationId) -> ServiceResult<()> {
        if !self.store.mark_notification_read(user_id, id).await? {
            return Err(DomainError::not_found(Resource::Notification, id).into());
        }
        Ok(())
    }

    /// Returns how many notifications flipped to read.
    pub async fn mark_all_read(&self, user_id: UserId) -> ServiceResult<u64> {
        Ok(self.store.mark_all_notifications_read(user_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::services::test_support::*;
    use crate::services::{OrderWorkflow, ServiceError};
    use crate::store::InMemoryStore;

    #[tokio::test]
    async fn only_the_recipient_can_mark_a_notification() {
        let store = Arc::new(InMemoryStore::new());
        let admin = admin(&store, "admin").await;
        let shopper = customer(&store, "shopper").await;
        let p = simple_product(&store, "Trimmer", 2100, 3).await;
        let workflow = OrderWorkflow::new(store.clone());
        workflow
            .place_order(&shopper, place(vec![item(p.id(), 1)]))
            .await
            .unwrap();
        workflow
            .place_order(&shopper, place(vec![item(p.id(), 1)]))
            .await
            .unwrap();

        let inbox = NotificationInbox::new(store.clone());
        let notes = inbox.list(admin.id).await.unwrap();
        assert_eq!(notes.len(), 2);
        assert_eq!(inbox.unread_count(admin.id).await.unwrap(), 2);

        let err = inbox.mark_read(shopper.id, notes[0].id()).await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Domain(DomainError::NotFound { resource: Resource::Notification, .. })
        ));

        inbox.mark_read(admin.id, notes[0].id()).await.unwrap();
        assert_eq!(inbox.unread_count(admin.id).await.unwrap(), 1);
        assert_eq!(inbox.mark_all_read(admin.id).await.unwrap(), 1);
        assert_eq!(inbox.unread_count(admin.id).await.unwrap(), 0);
    }
}
