use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use gadgetbazar_auth::{Role, User, VerifiedIdentity};
use gadgetbazar_catalog::{Product, ProductChange, ProductFilter};
use gadgetbazar_core::{DomainError, NotificationId, OrderId, ProductId, Resource, UserId};
use gadgetbazar_notifications::{
    Notification, RestockRequest, RestockStatus, WishlistEntry, new_order_notifications,
    order_status_notification, plan_product_fanout,
};
use gadgetbazar_orders::{Order, OrderStatus, PageRequest};

use super::{
    CartItem, DashboardCounts, ProductUpdate, StatusUpdate, Store, StoreError, StoreResult,
};

#[derive(Debug, Default)]
struct State {
    products: HashMap<ProductId, Product>,
    orders: HashMap<OrderId, Order>,
    users: HashMap<UserId, User>,
    notifications: Vec<Notification>,
    wishlist: Vec<WishlistEntry>,
    restock_requests: Vec<RestockRequest>,
    carts: HashMap<UserId, Vec<CartItem>>,
}

impl State {
    fn admins(&self) -> Vec<UserId> {
        let mut admins: Vec<&User> = self.users.values().filter(|u| u.role.is_admin()).collect();
        admins.sort_by_key(|u| (u.created_at, u.id));
        admins.into_iter().map(|u| u.id).collect()
    }
}

/// In-memory store.
///
/// Intended for tests/dev. Every operation runs under one mutex, which makes
/// each trait method a serializable unit.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))
    }
}

fn newest_first<T, K: Ord>(items: &mut [T], key: impl Fn(&T) -> K) {
    items.sort_by(|a, b| key(b).cmp(&key(a)));
}

fn page_of<T: Clone>(items: &[T], page: PageRequest) -> Vec<T> {
    let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
    items
        .iter()
        .skip(offset)
        .take(page.normalized().limit as usize)
        .cloned()
        .collect()
}

#[async_trait]
impl Store for InMemoryStore {
    async fn get_product(&self, id: ProductId) -> StoreResult<Option<Product>> {
        Ok(self.lock()?.products.get(&id).cloned())
    }

    async fn products_by_ids(&self, ids: &[ProductId]) -> StoreResult<Vec<Product>> {
        let state = self.lock()?;
        Ok(ids.iter().filter_map(|id| state.products.get(id).cloned()).collect())
    }

    async fn list_products(&self, filter: &ProductFilter) -> StoreResult<Vec<Product>> {
        let state = self.lock()?;
        let mut out: Vec<Product> = state
            .products
            .values()
            .filter(|p| p.matches(filter))
            .cloned()
            .collect();
        newest_first(&mut out, |p| (p.created_at(), p.id()));
        Ok(out)
    }

    async fn insert_product(&self, product: &Product) -> StoreResult<()> {
        let mut state = self.lock()?;
        if state.products.contains_key(&product.id()) {
            return Err(DomainError::conflict(format!("product {} already exists", product.id())).into());
        }
        state.products.insert(product.id(), product.clone());
        Ok(())
    }

    async fn delete_product(&self, id: ProductId) -> StoreResult<bool> {
        let mut state = self.lock()?;
        let removed = state.products.remove(&id).is_some();
        if removed {
            state.wishlist.retain(|w| w.product_id != id);
            state.restock_requests.retain(|r| r.product_id != id);
        }
        Ok(removed)
    }

    async fn apply_product_change(
        &self,
        id: ProductId,
        change: &ProductChange,
        now: DateTime<Utc>,
    ) -> StoreResult<ProductUpdate> {
        let mut state = self.lock()?;
        let before = state
            .products
            .get(&id)
            .cloned()
            .ok_or_else(|| DomainError::not_found(Resource::Product, id))?;

        let mut after = before.clone();
        change.apply(&mut after, now)?;

        let fanout = plan_product_fanout(
            &before,
            &after,
            &state.wishlist,
            &state.restock_requests,
            now,
        );

        state.products.insert(id, after.clone());
        for request in state
            .restock_requests
            .iter_mut()
            .filter(|r| fanout.restocked_requests.contains(&r.id))
        {
            request.status = RestockStatus::Restocked;
        }
        state.notifications.extend(fanout.notifications.iter().cloned());

        Ok(ProductUpdate {
            before,
            after,
            restocked_requests: fanout.restocked_requests.len(),
            notifications: fanout.notifications,
        })
    }

    async fn commit_order(
        &self,
        order: &Order,
        customer_label: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Vec<Notification>> {
        let mut state = self.lock()?;
        if state.orders.contains_key(&order.id()) {
            return Err(DomainError::conflict(format!("order {} already exists", order.id())).into());
        }

        // Reserve on a working copy; publish only if every line succeeds.
        let mut working: HashMap<ProductId, Product> = HashMap::new();
        for reservation in order.reservations() {
            let product = match working.entry(reservation.product_id) {
                Entry::Occupied(e) => e.into_mut(),
                Entry::Vacant(e) => e.insert(
                    state
                        .products
                        .get(&reservation.product_id)
                        .cloned()
                        .ok_or_else(|| DomainError::not_found(Resource::Product, reservation.product_id))?,
                ),
            };
            product.reserve(reservation.selector.as_ref(), reservation.quantity, now)?;
        }

        let notifications = new_order_notifications(order, customer_label, &state.admins(), now);

        state.products.extend(working);
        state.orders.insert(order.id(), order.clone());
        state.notifications.extend(notifications.iter().cloned());
        Ok(notifications)
    }

    async fn get_order(&self, id: OrderId) -> StoreResult<Option<Order>> {
        Ok(self.lock()?.orders.get(&id).cloned())
    }

    async fn orders_for_user(&self, user_id: UserId) -> StoreResult<Vec<Order>> {
        let state = self.lock()?;
        let mut out: Vec<Order> = state
            .orders
            .values()
            .filter(|o| o.user_id() == user_id)
            .cloned()
            .collect();
        newest_first(&mut out, |o| (o.created_at(), o.id()));
        Ok(out)
    }

    async fn list_orders(
        &self,
        page: PageRequest,
        status: Option<OrderStatus>,
    ) -> StoreResult<(Vec<Order>, u64)> {
        let state = self.lock()?;
        let mut all: Vec<Order> = state
            .orders
            .values()
            .filter(|o| status.is_none_or(|s| o.status() == s))
            .cloned()
            .collect();
        newest_first(&mut all, |o| (o.created_at(), o.id()));
        Ok((page_of(&all, page), all.len() as u64))
    }

    async fn update_order_status(
        &self,
        id: OrderId,
        status: OrderStatus,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<StatusUpdate>> {
        let mut state = self.lock()?;
        let Some(mut order) = state.orders.get(&id).cloned() else {
            return Ok(None);
        };

        let notification = order.set_status(status, now).map(|change| {
            let names: Vec<Option<String>> = order
                .lines()
                .iter()
                .map(|l| state.products.get(&l.product_id()).map(|p| p.name().to_string()))
                .collect();
            order_status_notification(&order, change, &names, now)
        });

        if let Some(n) = &notification {
            state.notifications.push(n.clone());
        }
        state.orders.insert(id, order.clone());
        Ok(Some(StatusUpdate { order, notification }))
    }

    async fn delete_order(&self, id: OrderId) -> StoreResult<bool> {
        Ok(self.lock()?.orders.remove(&id).is_some())
    }

    async fn upsert_user_from_identity(
        &self,
        identity: &VerifiedIdentity,
        now: DateTime<Utc>,
    ) -> StoreResult<User> {
        let mut state = self.lock()?;
        if let Some(user) = state.users.values_mut().find(|u| u.uid == identity.uid) {
            user.reconcile(identity);
            return Ok(user.clone());
        }
        let user = User::from_identity(identity, now);
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: UserId) -> StoreResult<Option<User>> {
        Ok(self.lock()?.users.get(&id).cloned())
    }

    async fn list_users(&self, page: PageRequest) -> StoreResult<(Vec<User>, u64)> {
        let state = self.lock()?;
        let mut all: Vec<User> = state.users.values().cloned().collect();
        newest_first(&mut all, |u| (u.created_at, u.id));
        Ok((page_of(&all, page), all.len() as u64))
    }

    async fn list_admins(&self) -> StoreResult<Vec<UserId>> {
        Ok(self.lock()?.admins())
    }

    async fn set_user_role(&self, id: UserId, role: Role) -> StoreResult<Option<User>> {
        let mut state = self.lock()?;
        Ok(state.users.get_mut(&id).map(|u| {
            u.role = role;
            u.clone()
        }))
    }

    async fn dashboard_counts(&self) -> StoreResult<DashboardCounts> {
        let state = self.lock()?;
        Ok(DashboardCounts {
            total_products: state.products.len() as u64,
            total_orders: state.orders.len() as u64,
            total_users: state.users.len() as u64,
        })
    }

    async fn notifications_for_user(&self, user_id: UserId) -> StoreResult<Vec<Notification>> {
        let state = self.lock()?;
        let mut out: Vec<Notification> = state
            .notifications
            .iter()
            .filter(|n| n.user_id() == user_id)
            .cloned()
            .collect();
        newest_first(&mut out, |n| (n.created_at(), n.id()));
        Ok(out)
    }

    async fn unread_count(&self, user_id: UserId) -> StoreResult<u64> {
        let state = self.lock()?;
        Ok(state
            .notifications
            .iter()
            .filter(|n| n.user_id() == user_id && !n.is_read())
            .count() as u64)
    }

    async fn mark_notification_read(&self, user_id: UserId, id: NotificationId) -> StoreResult<bool> {
        let mut state = self.lock()?;
        match state
            .notifications
            .iter_mut()
            .find(|n| n.id() == id && n.user_id() == user_id)
        {
            Some(n) => {
                n.mark_read();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn mark_all_notifications_read(&self, user_id: UserId) -> StoreResult<u64> {
        let mut state = self.lock()?;
        let mut count = 0;
        for n in state
            .notifications
            .iter_mut()
            .filter(|n| n.user_id() == user_id && !n.is_read())
        {
            n.mark_read();
            count += 1;
        }
        Ok(count)
    }

    async fn add_to_wishlist(&self, entry: &WishlistEntry) -> StoreResult<bool> {
        let mut state = self.lock()?;
        if state
            .wishlist
            .iter()
            .any(|w| w.user_id == entry.user_id && w.product_id == entry.product_id)
        {
            return Ok(false);
        }
        state.wishlist.push(entry.clone());
        Ok(true)
    }

    async fn remove_from_wishlist(&self, user_id: UserId, product_id: ProductId) -> StoreResult<bool> {
        let mut state = self.lock()?;
        let before = state.wishlist.len();
        state
            .wishlist
            .retain(|w| !(w.user_id == user_id && w.product_id == product_id));
        Ok(state.wishlist.len() != before)
    }

    async fn wishlist_for_user(&self, user_id: UserId) -> StoreResult<Vec<WishlistEntry>> {
        let state = self.lock()?;
        let mut out: Vec<WishlistEntry> = state
            .wishlist
            .iter()
            .filter(|w| w.user_id == user_id)
            .cloned()
            .collect();
        newest_first(&mut out, |w| w.created_at);
        Ok(out)
    }

    async fn insert_restock_request(&self, request: &RestockRequest) -> StoreResult<()> {
        self.lock()?.restock_requests.push(request.clone());
        Ok(())
    }

    async fn restock_requests_for_product(&self, product_id: ProductId) -> StoreResult<Vec<RestockRequest>> {
        let state = self.lock()?;
        Ok(state
            .restock_requests
            .iter()
            .filter(|r| r.product_id == product_id)
            .cloned()
            .collect())
    }

    async fn add_cart_item(&self, user_id: UserId, item: &CartItem) -> StoreResult<()> {
        let mut state = self.lock()?;
        let cart = state.carts.entry(user_id).or_default();
        match cart
            .iter_mut()
            .find(|c| c.product_id == item.product_id && c.variation == item.variation)
        {
            Some(existing) => {
                existing.quantity = existing
                    .quantity
                    .checked_add(item.quantity)
                    .ok_or_else(|| DomainError::validation("cart quantity overflows"))?;
            }
            None => cart.push(item.clone()),
        }
        Ok(())
    }

    async fn cart_items(&self, user_id: UserId) -> StoreResult<Vec<CartItem>> {
        Ok(self.lock()?.carts.get(&user_id).cloned().unwrap_or_default())
    }

    async fn clear_cart(&self, user_id: UserId) -> StoreResult<()> {
        self.lock()?.carts.remove(&user_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gadgetbazar_catalog::NewProduct;

    fn product(name: &str, stock: u32) -> Product {
        Product::create(
            ProductId::new(),
            NewProduct {
                name: name.to_string(),
                brand: None,
                description: None,
                price: 1000,
                original_price: None,
                stock_quantity: stock,
                variations: vec![],
            },
            Utc::now(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn duplicate_product_insert_is_a_conflict() {
        let store = InMemoryStore::new();
        let p = product("Lamp", 1);
        store.insert_product(&p).await.unwrap();
        let err = store.insert_product(&p).await.unwrap_err();
        assert!(matches!(err, StoreError::Domain(DomainError::Conflict(_))));
    }

    #[tokio::test]
    async fn deleting_a_product_drops_its_subscriptions() {
        let store = InMemoryStore::new();
        let p = product("Lamp", 0);
        store.insert_product(&p).await.unwrap();
        let user = UserId::new();
        store
            .add_to_wishlist(&WishlistEntry {
                user_id: user,
                product_id: p.id(),
                created_at: Utc::now(),
            })
            .await
            .unwrap();
        store
            .insert_restock_request(&RestockRequest::open(user, &p, None, Utc::now()).unwrap())
            .await
            .unwrap();

        assert!(store.delete_product(p.id()).await.unwrap());
        assert!(store.wishlist_for_user(user).await.unwrap().is_empty());
        assert!(store.restock_requests_for_product(p.id()).await.unwrap().is_empty());
        assert!(!store.delete_product(p.id()).await.unwrap());
    }

    #[tokio::test]
    async fn failed_change_leaves_product_untouched() {
        let store = InMemoryStore::new();
        let p = product("Lamp", 3);
        store.insert_product(&p).await.unwrap();

        let err = store
            .apply_product_change(
                p.id(),
                &ProductChange::Restock {
                    selector: None,
                    delta: 0,
                },
                Utc::now(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Domain(DomainError::Validation(_))));
        assert_eq!(store.get_product(p.id()).await.unwrap(), Some(p));
    }

    #[tokio::test]
    async fn admins_are_listed_oldest_first() {
        let store = InMemoryStore::new();
        let mut ids = Vec::new();
        for uid in ["first", "second"] {
            let identity = VerifiedIdentity {
                uid: uid.to_string(),
                email: format!("{uid}@example.com"),
                name: None,
                issuer: gadgetbazar_auth::Issuer::Admin,
            };
            let t = Utc::now() + chrono::Duration::seconds(ids.len() as i64);
            ids.push(store.upsert_user_from_identity(&identity, t).await.unwrap().id);
        }
        assert_eq!(store.list_admins().await.unwrap(), ids);
    }
}
