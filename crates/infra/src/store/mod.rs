//! Persistence boundary.
//!
//! One object-safe trait covers the catalog, orders, user directory,
//! notifications, subscriptions and carts. Every multi-row write that must be
//! all-or-nothing is a single trait method, so each backend can run it inside
//! one lock or one transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use gadgetbazar_auth::{Role, User, VerifiedIdentity};
use gadgetbazar_catalog::{Product, ProductChange, ProductFilter, VariationSelector};
use gadgetbazar_core::{DomainError, NotificationId, OrderId, ProductId, UserId};
use gadgetbazar_notifications::{Notification, RestockRequest, WishlistEntry};
use gadgetbazar_orders::{Order, OrderStatus, PageRequest};

pub mod in_memory;
pub mod postgres;

pub use in_memory::InMemoryStore;
pub use postgres::PostgresStore;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A business rule rejected the write (stock, validation, duplicates).
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("stored record is corrupt: {0}")]
    Corrupt(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Cart line. Only clearing matters to order placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub product_id: ProductId,
    #[serde(default)]
    pub variation: Option<VariationSelector>,
    pub quantity: u32,
}

/// Result of an admin product edit, with the fan-out committed alongside it.
#[derive(Debug, Clone)]
pub struct ProductUpdate {
    pub before: Product,
    pub after: Product,
    pub notifications: Vec<Notification>,
    pub restocked_requests: usize,
}

/// Result of an admin status update.
#[derive(Debug, Clone)]
pub struct StatusUpdate {
    pub order: Order,
    /// `None` when the status did not change.
    pub notification: Option<Notification>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardCounts {
    pub total_products: u64,
    pub total_orders: u64,
    pub total_users: u64,
}

#[async_trait]
pub trait Store: Send + Sync {
    // ── catalog ──────────────────────────────────────────────────────────
    async fn get_product(&self, id: ProductId) -> StoreResult<Option<Product>>;

    /// Products for the given ids; missing ids are skipped.
    async fn products_by_ids(&self, ids: &[ProductId]) -> StoreResult<Vec<Product>>;

    /// Newest first.
    async fn list_products(&self, filter: &ProductFilter) -> StoreResult<Vec<Product>>;

    async fn insert_product(&self, product: &Product) -> StoreResult<()>;

    async fn delete_product(&self, id: ProductId) -> StoreResult<bool>;

    /// Apply an admin change and the notifications it implies in one unit.
    ///
    /// Pending restock requests flipped by the fan-out are marked `restocked`
    /// in the same unit.
    async fn apply_product_change(
        &self,
        id: ProductId,
        change: &ProductChange,
        now: DateTime<Utc>,
    ) -> StoreResult<ProductUpdate>;

    // ── orders ───────────────────────────────────────────────────────────
    /// Reserve stock for every line, insert the order and one `new_order`
    /// notification per admin, all or nothing.
    ///
    /// A line that cannot be reserved fails the whole commit with
    /// `DomainError::InsufficientStock` and leaves no trace.
    async fn commit_order(
        &self,
        order: &Order,
        customer_label: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Vec<Notification>>;

    async fn get_order(&self, id: OrderId) -> StoreResult<Option<Order>>;

    /// Newest first.
    async fn orders_for_user(&self, user_id: UserId) -> StoreResult<Vec<Order>>;

    /// Newest first, with the total number of matching orders.
    async fn list_orders(
        &self,
        page: PageRequest,
        status: Option<OrderStatus>,
    ) -> StoreResult<(Vec<Order>, u64)>;

    async fn update_order_status(
        &self,
        id: OrderId,
        status: OrderStatus,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<StatusUpdate>>;

    async fn delete_order(&self, id: OrderId) -> StoreResult<bool>;

    // ── user directory ───────────────────────────────────────────────────
    /// Create the user on first sight, otherwise reconcile role and name.
    async fn upsert_user_from_identity(
        &self,
        identity: &VerifiedIdentity,
        now: DateTime<Utc>,
    ) -> StoreResult<User>;

    async fn get_user(&self, id: UserId) -> StoreResult<Option<User>>;

    /// Newest first, with the total number of users.
    async fn list_users(&self, page: PageRequest) -> StoreResult<(Vec<User>, u64)>;

    async fn list_admins(&self) -> StoreResult<Vec<UserId>>;

    async fn set_user_role(&self, id: UserId, role: Role) -> StoreResult<Option<User>>;

    async fn dashboard_counts(&self) -> StoreResult<DashboardCounts>;

    // ── notifications ────────────────────────────────────────────────────
    /// Newest first.
    async fn notifications_for_user(&self, user_id: UserId) -> StoreResult<Vec<Notification>>;

    async fn unread_count(&self, user_id: UserId) -> StoreResult<u64>;

    /// Only the recipient can mark a notification; returns false otherwise.
    async fn mark_notification_read(&self, user_id: UserId, id: NotificationId) -> StoreResult<bool>;

    async fn mark_all_notifications_read(&self, user_id: UserId) -> StoreResult<u64>;

    // ── subscriptions ────────────────────────────────────────────────────
    /// Returns false when the entry already existed.
    async fn add_to_wishlist(&self, entry: &WishlistEntry) -> StoreResult<bool>;

    async fn remove_from_wishlist(&self, user_id: UserId, product_id: ProductId) -> StoreResult<bool>;

    async fn wishlist_for_user(&self, user_id: UserId) -> StoreResult<Vec<WishlistEntry>>;

    async fn insert_restock_request(&self, request: &RestockRequest) -> StoreResult<()>;

    async fn restock_requests_for_product(&self, product_id: ProductId) -> StoreResult<Vec<RestockRequest>>;

    // ── cart ─────────────────────────────────────────────────────────────
    /// Adds to the quantity of an existing product+variation line.
    async fn add_cart_item(&self, user_id: UserId, item: &CartItem) -> StoreResult<()>;

    async fn cart_items(&self, user_id: UserId) -> StoreResult<Vec<CartItem>>;

    async fn clear_cart(&self, user_id: UserId) -> StoreResult<()>;
}
