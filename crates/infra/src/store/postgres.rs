//! Postgres-backed store.
//!
//! ## Stock reservation
//!
//! `commit_order` runs in one transaction. Each line is a conditional
//! decrement (`UPDATE … WHERE stock >= $qty AND in_stock`); a zero-row update
//! rolls the whole transaction back, so no earlier line, order row or
//! notification survives. Lines are applied in product id order so two
//! concurrent orders lock rows in the same sequence.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique violation) | `23505` | `Domain(Conflict)` |
//! | Database (foreign key / check violation) | `23503` / `23514` | `Domain(Validation)` |
//! | Database (other) | Any other | `Backend` |
//! | PoolClosed / RowNotFound / Other | N/A | `Backend` |

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{FromRow, PgConnection, PgPool, Row};
use tracing::{Span, instrument};
use uuid::Uuid;

use gadgetbazar_auth::{Role, User, VerifiedIdentity};
use gadgetbazar_catalog::{
    Product, ProductChange, ProductFilter, ProductRecord, Reservation, Variation, VariationSelector,
};
use gadgetbazar_core::{
    DomainError, NotificationId, OrderId, ProductId, Resource, RestockRequestId, UserId,
};
use gadgetbazar_notifications::{
    Notification, NotificationKind, RestockRequest, RestockStatus, WishlistEntry,
    new_order_notifications, order_status_notification, plan_product_fanout,
};
use gadgetbazar_orders::{Order, OrderLine, OrderStatus, PageRequest, PaymentMethod};

use super::{
    CartItem, DashboardCounts, ProductUpdate, StatusUpdate, Store, StoreError, StoreResult,
};

const SCHEMA: &str = include_str!("schema.sql");

const PRODUCT_COLUMNS: &str = "id, name, brand, description, price, original_price, \
     stock_quantity, in_stock, created_at, updated_at";

const ORDER_COLUMNS: &str = "id, user_id, lines, total_amount, shipping_address, phone, \
     payment_method, payment_details, status, created_at, updated_at";

const USER_COLUMNS: &str = "id, uid, email, display_name, role, created_at";

const NOTIFICATION_COLUMNS: &str = "id, user_id, kind, title, message, data, is_read, created_at";

/// Postgres-backed store.
///
/// `Send + Sync`; all access goes through the SQLx pool.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: Arc<PgPool>,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Connect with a bounded pool.
    pub async fn connect(database_url: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create tables and indexes if they do not exist yet.
    #[instrument(skip(self), err)]
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;
        Ok(())
    }

    async fn conn(&self) -> StoreResult<sqlx::pool::PoolConnection<sqlx::Postgres>> {
        self.pool
            .acquire()
            .await
            .map_err(|e| map_sqlx_error("acquire", e))
    }

    async fn begin(&self) -> StoreResult<sqlx::Transaction<'static, sqlx::Postgres>> {
        self.pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))
    }

    /// Work out why a conditional decrement matched no row.
    async fn reservation_failure(&self, reservation: &Reservation) -> StoreError {
        let product = match self.get_product(reservation.product_id).await {
            Ok(Some(p)) => p,
            Ok(None) => return DomainError::not_found(Resource::Product, reservation.product_id).into(),
            Err(e) => return e,
        };
        match product.check_reservation(reservation.selector.as_ref(), reservation.quantity) {
            Err(e) => e.into(),
            // Stock came back after our update lost the race; still report the shortfall we saw.
            Ok(()) => DomainError::insufficient_stock(
                product.id(),
                product.name().to_string(),
                reservation.quantity,
                0,
            )
            .into(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Connection-level helpers (shared by pool reads and transactions)
// ─────────────────────────────────────────────────────────────────────────────

async fn hydrate_products(conn: &mut PgConnection, rows: Vec<ProductRow>) -> StoreResult<Vec<Product>> {
    if rows.is_empty() {
        return Ok(vec![]);
    }
    let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
    let variation_rows = sqlx::query(
        r#"
        SELECT product_id, position, color, ram, rom, stock, price
        FROM product_variations
        WHERE product_id = ANY($1)
        ORDER BY product_id, position
        "#,
    )
    .bind(&ids)
    .fetch_all(&mut *conn)
    .await
    .map_err(|e| map_sqlx_error("load_variations", e))?;

    let mut variations: HashMap<Uuid, Vec<Variation>> = HashMap::new();
    for row in variation_rows {
        let v = VariationRow::from_row(&row).map_err(|e| map_sqlx_error("decode_variation", e))?;
        variations.entry(v.product_id).or_default().push(v.try_into()?);
    }

    rows.into_iter()
        .map(|row| {
            let vs = variations.remove(&row.id).unwrap_or_default();
            row.into_product(vs)
        })
        .collect()
}

async fn load_products_by_ids(
    conn: &mut PgConnection,
    ids: &[Uuid],
    for_update: bool,
) -> StoreResult<Vec<Product>> {
    let sql = format!(
        "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ANY($1){}",
        if for_update { " FOR UPDATE" } else { "" }
    );
    let rows = sqlx::query(&sql)
        .bind(ids)
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| map_sqlx_error("load_products", e))?;
    let rows = rows
        .iter()
        .map(ProductRow::from_row)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| map_sqlx_error("decode_product", e))?;
    hydrate_products(conn, rows).await
}

async fn write_variations(conn: &mut PgConnection, product: &Product) -> StoreResult<()> {
    sqlx::query("DELETE FROM product_variations WHERE product_id = $1")
        .bind(product.id().as_uuid())
        .execute(&mut *conn)
        .await
        .map_err(|e| map_sqlx_error("delete_variations", e))?;

    for (position, v) in product.variations().iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO product_variations (product_id, position, color, ram, rom, stock, price)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(product.id().as_uuid())
        .bind(i32::try_from(position).map_err(|_| DomainError::validation("too many variations"))?)
        .bind(&v.selector.color)
        .bind(&v.selector.ram)
        .bind(&v.selector.rom)
        .bind(i64::from(v.stock))
        .bind(v.price.map(|p| to_i64(p, "variation price")).transpose()?)
        .execute(&mut *conn)
        .await
        .map_err(|e| map_sqlx_error("insert_variation", e))?;
    }
    Ok(())
}

async fn update_product_row(conn: &mut PgConnection, product: &Product) -> StoreResult<()> {
    sqlx::query(
        r#"
        UPDATE products
        SET name = $2, brand = $3, description = $4, price = $5, original_price = $6,
            stock_quantity = $7, in_stock = $8, updated_at = $9
        WHERE id = $1
        "#,
    )
    .bind(product.id().as_uuid())
    .bind(product.name())
    .bind(product.brand())
    .bind(product.description())
    .bind(to_i64(product.price(), "price")?)
    .bind(product.original_price().map(|p| to_i64(p, "original price")).transpose()?)
    .bind(i64::from(product.stock_quantity()))
    .bind(product.in_stock())
    .bind(product.updated_at())
    .execute(&mut *conn)
    .await
    .map_err(|e| map_sqlx_error("update_product", e))?;
    write_variations(conn, product).await
}

async fn insert_notifications(conn: &mut PgConnection, notifications: &[Notification]) -> StoreResult<()> {
    for n in notifications {
        sqlx::query(
            r#"
            INSERT INTO notifications (id, user_id, kind, title, message, data, is_read, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(n.id().as_uuid())
        .bind(n.user_id().as_uuid())
        .bind(n.kind().as_str())
        .bind(n.title())
        .bind(n.message())
        .bind(n.data())
        .bind(n.is_read())
        .bind(n.created_at())
        .execute(&mut *conn)
        .await
        .map_err(|e| map_sqlx_error("insert_notification", e))?;
    }
    Ok(())
}

async fn admin_ids(conn: &mut PgConnection) -> StoreResult<Vec<UserId>> {
    let rows = sqlx::query("SELECT id FROM users WHERE role = 'admin' ORDER BY created_at, id")
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| map_sqlx_error("list_admins", e))?;
    rows.iter()
        .map(|r| {
            r.try_get::<Uuid, _>("id")
                .map(UserId::from_uuid)
                .map_err(|e| map_sqlx_error("decode_user_id", e))
        })
        .collect()
}

/// Conditional decrement for one line. Returns false when no row matched;
/// the caller must then roll back, since a variation line may have already
/// decremented the product row.
async fn reserve_line(
    conn: &mut PgConnection,
    reservation: &Reservation,
    now: DateTime<Utc>,
) -> StoreResult<bool> {
    let qty = i64::from(reservation.quantity);
    let product_id = reservation.product_id.as_uuid();

    match &reservation.selector {
        // Product row first, then the variation: the same lock order as
        // `apply_product_change`, which holds `products` FOR UPDATE while it
        // rewrites the variations.
        Some(sel) => {
            let product = sqlx::query(
                r#"
                UPDATE products
                SET stock_quantity = stock_quantity - $2,
                    in_stock = (stock_quantity - $2) > 0,
                    updated_at = $3
                WHERE id = $1 AND in_stock AND stock_quantity >= $2
                "#,
            )
            .bind(product_id)
            .bind(qty)
            .bind(now)
            .execute(&mut *conn)
            .await
            .map_err(|e| map_sqlx_error("reserve_product", e))?;
            if product.rows_affected() == 0 {
                return Ok(false);
            }

            let variation = sqlx::query(
                r#"
                UPDATE product_variations
                SET stock = stock - $5
                WHERE product_id = $1
                  AND color = $2
                  AND ram IS NOT DISTINCT FROM $3
                  AND rom IS NOT DISTINCT FROM $4
                  AND stock >= $5
                "#,
            )
            .bind(product_id)
            .bind(&sel.color)
            .bind(&sel.ram)
            .bind(&sel.rom)
            .bind(qty)
            .execute(&mut *conn)
            .await
            .map_err(|e| map_sqlx_error("reserve_variation", e))?;
            // A miss here is undone with the rest of the transaction.
            Ok(variation.rows_affected() == 1)
        }
        None => {
            let product = sqlx::query(
                r#"
                UPDATE products
                SET stock_quantity = stock_quantity - $2,
                    in_stock = (stock_quantity - $2) > 0,
                    updated_at = $3
                WHERE id = $1
                  AND in_stock
                  AND stock_quantity >= $2
                  AND NOT EXISTS (SELECT 1 FROM product_variations v WHERE v.product_id = products.id)
                "#,
            )
            .bind(product_id)
            .bind(qty)
            .bind(now)
            .execute(&mut *conn)
            .await
            .map_err(|e| map_sqlx_error("reserve_product", e))?;
            Ok(product.rows_affected() == 1)
        }
    }
}

async fn rollback(tx: sqlx::Transaction<'static, sqlx::Postgres>) -> StoreResult<()> {
    tx.rollback().await.map_err(|e| map_sqlx_error("rollback", e))
}

async fn commit(tx: sqlx::Transaction<'static, sqlx::Postgres>) -> StoreResult<()> {
    tx.commit()
        .await
        .map_err(|e| map_sqlx_error("commit_transaction", e))
}

#[async_trait]
impl Store for PostgresStore {
    #[instrument(skip(self), fields(product_id = %id), err)]
    async fn get_product(&self, id: ProductId) -> StoreResult<Option<Product>> {
        let mut conn = self.conn().await?;
        Ok(load_products_by_ids(&mut conn, &[*id.as_uuid()], false)
            .await?
            .into_iter()
            .next())
    }

    #[instrument(skip(self, ids), fields(count = ids.len()), err)]
    async fn products_by_ids(&self, ids: &[ProductId]) -> StoreResult<Vec<Product>> {
        let uuids: Vec<Uuid> = ids.iter().map(|id| *id.as_uuid()).collect();
        let mut conn = self.conn().await?;
        let mut found: HashMap<ProductId, Product> = load_products_by_ids(&mut conn, &uuids, false)
            .await?
            .into_iter()
            .map(|p| (p.id(), p))
            .collect();
        Ok(ids.iter().filter_map(|id| found.remove(id)).collect())
    }

    #[instrument(skip(self), err)]
    async fn list_products(&self, filter: &ProductFilter) -> StoreResult<Vec<Product>> {
        let mut conn = self.conn().await?;
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE ($1 = FALSE OR in_stock) \
             ORDER BY created_at DESC, id DESC"
        );
        let rows = sqlx::query(&sql)
            .bind(filter.in_stock_only)
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| map_sqlx_error("list_products", e))?;
        let rows = rows
            .iter()
            .map(ProductRow::from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| map_sqlx_error("decode_product", e))?;
        let products = hydrate_products(&mut conn, rows).await?;
        Ok(products.into_iter().filter(|p| p.matches(filter)).collect())
    }

    #[instrument(skip(self, product), fields(product_id = %product.id()), err)]
    async fn insert_product(&self, product: &Product) -> StoreResult<()> {
        let mut tx = self.begin().await?;
        sqlx::query(
            r#"
            INSERT INTO products (
                id, name, brand, description, price, original_price,
                stock_quantity, in_stock, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(product.id().as_uuid())
        .bind(product.name())
        .bind(product.brand())
        .bind(product.description())
        .bind(to_i64(product.price(), "price")?)
        .bind(product.original_price().map(|p| to_i64(p, "original price")).transpose()?)
        .bind(i64::from(product.stock_quantity()))
        .bind(product.in_stock())
        .bind(product.created_at())
        .bind(product.updated_at())
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert_product", e))?;
        write_variations(&mut tx, product).await?;
        commit(tx).await
    }

    #[instrument(skip(self), fields(product_id = %id), err)]
    async fn delete_product(&self, id: ProductId) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_product", e))?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(
        skip(self, change),
        fields(product_id = %id, notifications = tracing::field::Empty),
        err
    )]
    async fn apply_product_change(
        &self,
        id: ProductId,
        change: &ProductChange,
        now: DateTime<Utc>,
    ) -> StoreResult<ProductUpdate> {
        let mut tx = self.begin().await?;

        let Some(before) = load_products_by_ids(&mut tx, &[*id.as_uuid()], true)
            .await?
            .into_iter()
            .next()
        else {
            rollback(tx).await?;
            return Err(DomainError::not_found(Resource::Product, id).into());
        };

        let mut after = before.clone();
        if let Err(e) = change.apply(&mut after, now) {
            rollback(tx).await?;
            return Err(e.into());
        }

        let wishlist = sqlx::query(
            "SELECT user_id, product_id, created_at FROM wishlist_entries WHERE product_id = $1",
        )
        .bind(id.as_uuid())
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("load_wishlist", e))?
        .iter()
        .map(wishlist_from_row)
        .collect::<StoreResult<Vec<_>>>()?;

        let requests = sqlx::query(
            r#"
            SELECT id, user_id, product_id, variation, status, created_at
            FROM restock_requests
            WHERE product_id = $1 AND status = 'pending'
            ORDER BY created_at
            FOR UPDATE
            "#,
        )
        .bind(id.as_uuid())
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("load_restock_requests", e))?
        .iter()
        .map(restock_request_from_row)
        .collect::<StoreResult<Vec<_>>>()?;

        let fanout = plan_product_fanout(&before, &after, &wishlist, &requests, now);

        update_product_row(&mut tx, &after).await?;
        if !fanout.restocked_requests.is_empty() {
            let ids: Vec<Uuid> = fanout.restocked_requests.iter().map(|r| *r.as_uuid()).collect();
            sqlx::query("UPDATE restock_requests SET status = 'restocked' WHERE id = ANY($1)")
                .bind(&ids)
                .execute(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("mark_restocked", e))?;
        }
        insert_notifications(&mut tx, &fanout.notifications).await?;
        commit(tx).await?;

        Span::current().record("notifications", fanout.notifications.len());
        Ok(ProductUpdate {
            before,
            after,
            restocked_requests: fanout.restocked_requests.len(),
            notifications: fanout.notifications,
        })
    }

    #[instrument(
        skip(self, order, customer_label),
        fields(order_id = %order.id(), line_count = order.lines().len()),
        err
    )]
    async fn commit_order(
        &self,
        order: &Order,
        customer_label: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Vec<Notification>> {
        let mut reservations = order.reservations();
        reservations.sort_by_key(|r| r.product_id);

        let mut tx = self.begin().await?;

        for reservation in &reservations {
            if !reserve_line(&mut tx, reservation, now).await? {
                rollback(tx).await?;
                return Err(self.reservation_failure(reservation).await);
            }
        }

        let lines = serde_json::to_value(order.lines())
            .map_err(|e| StoreError::Backend(format!("failed to encode order lines: {e}")))?;
        sqlx::query(
            r#"
            INSERT INTO orders (
                id, user_id, lines, total_amount, shipping_address, phone,
                payment_method, payment_details, status, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(order.id().as_uuid())
        .bind(order.user_id().as_uuid())
        .bind(&lines)
        .bind(to_i64(order.total_amount(), "order total")?)
        .bind(order.shipping_address())
        .bind(order.phone())
        .bind(order.payment_method().as_str())
        .bind(order.payment_details())
        .bind(order.status().as_str())
        .bind(order.created_at())
        .bind(order.updated_at())
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert_order", e))?;

        let admins = admin_ids(&mut tx).await?;
        let notifications = new_order_notifications(order, customer_label, &admins, now);
        insert_notifications(&mut tx, &notifications).await?;

        commit(tx).await?;
        Ok(notifications)
    }

    #[instrument(skip(self), fields(order_id = %id), err)]
    async fn get_order(&self, id: OrderId) -> StoreResult<Option<Order>> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_order", e))?;
        row.as_ref().map(order_from_row).transpose()
    }

    #[instrument(skip(self), fields(user_id = %user_id), err)]
    async fn orders_for_user(&self, user_id: UserId) -> StoreResult<Vec<Order>> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 ORDER BY created_at DESC, id DESC"
        );
        sqlx::query(&sql)
            .bind(user_id.as_uuid())
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("orders_for_user", e))?
            .iter()
            .map(order_from_row)
            .collect()
    }

    #[instrument(skip(self), err)]
    async fn list_orders(
        &self,
        page: PageRequest,
        status: Option<OrderStatus>,
    ) -> StoreResult<(Vec<Order>, u64)> {
        let page = page.normalized();
        let status = status.map(|s| s.as_str());

        let total: i64 = sqlx::query("SELECT COUNT(*) AS n FROM orders WHERE ($1::TEXT IS NULL OR status = $1)")
            .bind(status)
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_orders", e))?
            .try_get("n")
            .map_err(|e| map_sqlx_error("decode_count", e))?;

        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE ($1::TEXT IS NULL OR status = $1) \
             ORDER BY created_at DESC, id DESC LIMIT $2 OFFSET $3"
        );
        let orders = sqlx::query(&sql)
            .bind(status)
            .bind(i64::from(page.limit))
            .bind(to_i64(page.offset(), "offset")?)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_orders", e))?
            .iter()
            .map(order_from_row)
            .collect::<StoreResult<Vec<_>>>()?;

        Ok((orders, from_i64(total, "order count")?))
    }

    #[instrument(skip(self), fields(order_id = %id, status = %status), err)]
    async fn update_order_status(
        &self,
        id: OrderId,
        status: OrderStatus,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<StatusUpdate>> {
        let mut tx = self.begin().await?;

        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 FOR UPDATE");
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("load_order", e))?;
        let Some(row) = row else {
            rollback(tx).await?;
            return Ok(None);
        };
        let mut order = order_from_row(&row)?;

        let Some(change) = order.set_status(status, now) else {
            rollback(tx).await?;
            return Ok(Some(StatusUpdate {
                order,
                notification: None,
            }));
        };

        let ids: Vec<Uuid> = order.lines().iter().map(|l| *l.product_id().as_uuid()).collect();
        let names: HashMap<Uuid, String> = sqlx::query("SELECT id, name FROM products WHERE id = ANY($1)")
            .bind(&ids)
            .fetch_all(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("load_product_names", e))?
            .iter()
            .map(|r| -> Result<(Uuid, String), sqlx::Error> {
                Ok((r.try_get("id")?, r.try_get("name")?))
            })
            .collect::<Result<_, sqlx::Error>>()
            .map_err(|e| map_sqlx_error("decode_product_name", e))?;
        let current_names: Vec<Option<String>> = ids.iter().map(|id| names.get(id).cloned()).collect();
        let notification = order_status_notification(&order, change, &current_names, now);

        sqlx::query("UPDATE orders SET status = $2, updated_at = $3 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(order.status().as_str())
            .bind(order.updated_at())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("update_order_status", e))?;
        insert_notifications(&mut tx, std::slice::from_ref(&notification)).await?;
        commit(tx).await?;

        Ok(Some(StatusUpdate {
            order,
            notification: Some(notification),
        }))
    }

    #[instrument(skip(self), fields(order_id = %id), err)]
    async fn delete_order(&self, id: OrderId) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_order", e))?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, identity), fields(uid = %identity.uid), err)]
    async fn upsert_user_from_identity(
        &self,
        identity: &VerifiedIdentity,
        now: DateTime<Utc>,
    ) -> StoreResult<User> {
        let candidate = User::from_identity(identity, now);
        let mut tx = self.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO users (id, uid, email, display_name, role, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (uid) DO NOTHING
            "#,
        )
        .bind(candidate.id.as_uuid())
        .bind(&candidate.uid)
        .bind(&candidate.email)
        .bind(&candidate.display_name)
        .bind(candidate.role.as_str())
        .bind(candidate.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert_user", e))?;

        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE uid = $1 FOR UPDATE");
        let row = sqlx::query(&sql)
            .bind(&identity.uid)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("load_user", e))?;
        let mut user = user_from_row(&row)?;

        if user.reconcile(identity) {
            sqlx::query("UPDATE users SET role = $2, display_name = $3 WHERE id = $1")
                .bind(user.id.as_uuid())
                .bind(user.role.as_str())
                .bind(&user.display_name)
                .execute(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("reconcile_user", e))?;
        }

        commit(tx).await?;
        Ok(user)
    }

    #[instrument(skip(self), fields(user_id = %id), err)]
    async fn get_user(&self, id: UserId) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_user", e))?
            .as_ref()
            .map(user_from_row)
            .transpose()
    }

    #[instrument(skip(self), err)]
    async fn list_users(&self, page: PageRequest) -> StoreResult<(Vec<User>, u64)> {
        let page = page.normalized();
        let total: i64 = sqlx::query("SELECT COUNT(*) AS n FROM users")
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_users", e))?
            .try_get("n")
            .map_err(|e| map_sqlx_error("decode_count", e))?;

        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC, id DESC LIMIT $1 OFFSET $2"
        );
        let users = sqlx::query(&sql)
            .bind(i64::from(page.limit))
            .bind(to_i64(page.offset(), "offset")?)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_users", e))?
            .iter()
            .map(user_from_row)
            .collect::<StoreResult<Vec<_>>>()?;
        Ok((users, from_i64(total, "user count")?))
    }

    #[instrument(skip(self), err)]
    async fn list_admins(&self) -> StoreResult<Vec<UserId>> {
        let mut conn = self.conn().await?;
        admin_ids(&mut conn).await
    }

    #[instrument(skip(self), fields(user_id = %id, role = %role), err)]
    async fn set_user_role(&self, id: UserId, role: Role) -> StoreResult<Option<User>> {
        let sql = format!("UPDATE users SET role = $2 WHERE id = $1 RETURNING {USER_COLUMNS}");
        sqlx::query(&sql)
            .bind(id.as_uuid())
            .bind(role.as_str())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("set_user_role", e))?
            .as_ref()
            .map(user_from_row)
            .transpose()
    }

    #[instrument(skip(self), err)]
    async fn dashboard_counts(&self) -> StoreResult<DashboardCounts> {
        let row = sqlx::query(
            r#"
            SELECT
                (SELECT COUNT(*) FROM products) AS products,
                (SELECT COUNT(*) FROM orders) AS orders,
                (SELECT COUNT(*) FROM users) AS users
            "#,
        )
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("dashboard_counts", e))?;
        let get = |col: &str| -> StoreResult<u64> {
            let n: i64 = row.try_get(col).map_err(|e| map_sqlx_error("decode_count", e))?;
            from_i64(n, col)
        };
        Ok(DashboardCounts {
            total_products: get("products")?,
            total_orders: get("orders")?,
            total_users: get("users")?,
        })
    }

    #[instrument(skip(self), fields(user_id = %user_id), err)]
    async fn notifications_for_user(&self, user_id: UserId) -> StoreResult<Vec<Notification>> {
        let sql = format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE user_id = $1 \
             ORDER BY created_at DESC, id DESC"
        );
        sqlx::query(&sql)
            .bind(user_id.as_uuid())
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("notifications_for_user", e))?
            .iter()
            .map(notification_from_row)
            .collect()
    }

    #[instrument(skip(self), fields(user_id = %user_id), err)]
    async fn unread_count(&self, user_id: UserId) -> StoreResult<u64> {
        let n: i64 = sqlx::query("SELECT COUNT(*) AS n FROM notifications WHERE user_id = $1 AND NOT is_read")
            .bind(user_id.as_uuid())
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("unread_count", e))?
            .try_get("n")
            .map_err(|e| map_sqlx_error("decode_count", e))?;
        from_i64(n, "unread count")
    }

    #[instrument(skip(self), fields(user_id = %user_id, notification_id = %id), err)]
    async fn mark_notification_read(&self, user_id: UserId, id: NotificationId) -> StoreResult<bool> {
        let result = sqlx::query("UPDATE notifications SET is_read = TRUE WHERE id = $1 AND user_id = $2")
            .bind(id.as_uuid())
            .bind(user_id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("mark_notification_read", e))?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self), fields(user_id = %user_id), err)]
    async fn mark_all_notifications_read(&self, user_id: UserId) -> StoreResult<u64> {
        let result = sqlx::query("UPDATE notifications SET is_read = TRUE WHERE user_id = $1 AND NOT is_read")
            .bind(user_id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("mark_all_notifications_read", e))?;
        Ok(result.rows_affected())
    }

    #[instrument(skip(self, entry), fields(user_id = %entry.user_id, product_id = %entry.product_id), err)]
    async fn add_to_wishlist(&self, entry: &WishlistEntry) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO wishlist_entries (user_id, product_id, created_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, product_id) DO NOTHING
            "#,
        )
        .bind(entry.user_id.as_uuid())
        .bind(entry.product_id.as_uuid())
        .bind(entry.created_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("add_to_wishlist", e))?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self), fields(user_id = %user_id, product_id = %product_id), err)]
    async fn remove_from_wishlist(&self, user_id: UserId, product_id: ProductId) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM wishlist_entries WHERE user_id = $1 AND product_id = $2")
            .bind(user_id.as_uuid())
            .bind(product_id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("remove_from_wishlist", e))?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self), fields(user_id = %user_id), err)]
    async fn wishlist_for_user(&self, user_id: UserId) -> StoreResult<Vec<WishlistEntry>> {
        sqlx::query(
            "SELECT user_id, product_id, created_at FROM wishlist_entries \
             WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("wishlist_for_user", e))?
        .iter()
        .map(wishlist_from_row)
        .collect()
    }

    #[instrument(skip(self, request), fields(request_id = %request.id, product_id = %request.product_id), err)]
    async fn insert_restock_request(&self, request: &RestockRequest) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO restock_requests (id, user_id, product_id, variation, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(request.id.as_uuid())
        .bind(request.user_id.as_uuid())
        .bind(request.product_id.as_uuid())
        .bind(selector_json(request.variation.as_ref())?)
        .bind(request.status.as_str())
        .bind(request.created_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_restock_request", e))?;
        Ok(())
    }

    #[instrument(skip(self), fields(product_id = %product_id), err)]
    async fn restock_requests_for_product(&self, product_id: ProductId) -> StoreResult<Vec<RestockRequest>> {
        sqlx::query(
            "SELECT id, user_id, product_id, variation, status, created_at FROM restock_requests \
             WHERE product_id = $1 ORDER BY created_at",
        )
        .bind(product_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("restock_requests_for_product", e))?
        .iter()
        .map(restock_request_from_row)
        .collect()
    }

    #[instrument(skip(self, item), fields(user_id = %user_id, product_id = %item.product_id), err)]
    async fn add_cart_item(&self, user_id: UserId, item: &CartItem) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO cart_items (user_id, product_id, variation_key, variation, quantity)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (user_id, product_id, variation_key)
            DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(item.product_id.as_uuid())
        .bind(item.variation.as_ref().map(VariationSelector::label).unwrap_or_default())
        .bind(selector_json(item.variation.as_ref())?)
        .bind(i64::from(item.quantity))
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("add_cart_item", e))?;
        Ok(())
    }

    #[instrument(skip(self), fields(user_id = %user_id), err)]
    async fn cart_items(&self, user_id: UserId) -> StoreResult<Vec<CartItem>> {
        sqlx::query(
            "SELECT product_id, variation, quantity FROM cart_items WHERE user_id = $1 ORDER BY added_at",
        )
        .bind(user_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("cart_items", e))?
        .iter()
        .map(|row| {
            let product_id: Uuid = row.try_get("product_id").map_err(|e| map_sqlx_error("decode_cart", e))?;
            let variation: Option<serde_json::Value> =
                row.try_get("variation").map_err(|e| map_sqlx_error("decode_cart", e))?;
            let quantity: i64 = row.try_get("quantity").map_err(|e| map_sqlx_error("decode_cart", e))?;
            Ok(CartItem {
                product_id: ProductId::from_uuid(product_id),
                variation: selector_from_json(variation)?,
                quantity: from_i64(quantity, "cart quantity")?,
            })
        })
        .collect()
    }

    #[instrument(skip(self), fields(user_id = %user_id), err)]
    async fn clear_cart(&self, user_id: UserId) -> StoreResult<()> {
        sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
            .bind(user_id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("clear_cart", e))?;
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Error and value mapping
// ─────────────────────────────────────────────────────────────────────────────

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => DomainError::conflict(msg).into(),
                Some("23503") | Some("23514") => DomainError::validation(msg).into(),
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::PoolClosed => StoreError::Backend(format!("connection pool closed in {operation}")),
        sqlx::Error::RowNotFound => StoreError::Backend(format!("unexpected row not found in {operation}")),
        other => StoreError::Backend(format!("sqlx error in {operation}: {other}")),
    }
}

fn to_i64(value: u64, what: &str) -> StoreResult<i64> {
    i64::try_from(value).map_err(|_| DomainError::validation(format!("{what} is out of range")).into())
}

fn from_i64<T: TryFrom<i64>>(value: i64, what: &str) -> StoreResult<T> {
    T::try_from(value).map_err(|_| StoreError::Corrupt(format!("{what} out of range: {value}")))
}

fn parse_column<T: FromStr>(value: &str, what: &str) -> StoreResult<T> {
    value
        .parse()
        .map_err(|_| StoreError::Corrupt(format!("unknown {what}: {value}")))
}

fn selector_json(selector: Option<&VariationSelector>) -> StoreResult<Option<serde_json::Value>> {
    selector
        .map(serde_json::to_value)
        .transpose()
        .map_err(|e| StoreError::Backend(format!("failed to encode variation: {e}")))
}

fn selector_from_json(value: Option<serde_json::Value>) -> StoreResult<Option<VariationSelector>> {
    value
        .filter(|v| !v.is_null())
        .map(serde_json::from_value)
        .transpose()
        .map_err(|e| StoreError::Corrupt(format!("bad variation selector: {e}")))
}

// SQLx row types

#[derive(Debug)]
struct ProductRow {
    id: Uuid,
    name: String,
    brand: Option<String>,
    description: Option<String>,
    price: i64,
    original_price: Option<i64>,
    stock_quantity: i64,
    in_stock: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for ProductRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(ProductRow {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            brand: row.try_get("brand")?,
            description: row.try_get("description")?,
            price: row.try_get("price")?,
            original_price: row.try_get("original_price")?,
            stock_quantity: row.try_get("stock_quantity")?,
            in_stock: row.try_get("in_stock")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl ProductRow {
    fn into_product(self, variations: Vec<Variation>) -> StoreResult<Product> {
        let record = ProductRecord {
            id: ProductId::from_uuid(self.id),
            name: self.name,
            brand: self.brand,
            description: self.description,
            price: from_i64(self.price, "price")?,
            original_price: self.original_price.map(|p| from_i64(p, "original price")).transpose()?,
            stock_quantity: from_i64(self.stock_quantity, "stock quantity")?,
            in_stock: self.in_stock,
            variations,
            created_at: self.created_at,
            updated_at: self.updated_at,
        };
        Product::rehydrate(record).map_err(|e| StoreError::Corrupt(e.to_string()))
    }
}

#[derive(Debug)]
struct VariationRow {
    product_id: Uuid,
    color: String,
    ram: Option<String>,
    rom: Option<String>,
    stock: i64,
    price: Option<i64>,
}

impl<'r> FromRow<'r, PgRow> for VariationRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(VariationRow {
            product_id: row.try_get("product_id")?,
            color: row.try_get("color")?,
            ram: row.try_get("ram")?,
            rom: row.try_get("rom")?,
            stock: row.try_get("stock")?,
            price: row.try_get("price")?,
        })
    }
}

impl TryFrom<VariationRow> for Variation {
    type Error = StoreError;

    fn try_from(row: VariationRow) -> Result<Self, Self::Error> {
        Ok(Variation {
            selector: VariationSelector {
                color: row.color,
                ram: row.ram,
                rom: row.rom,
            },
            stock: from_i64(row.stock, "variation stock")?,
            price: row.price.map(|p| from_i64(p, "variation price")).transpose()?,
        })
    }
}

fn order_from_row(row: &PgRow) -> StoreResult<Order> {
    let decode = |e| map_sqlx_error("decode_order", e);
    let id: Uuid = row.try_get("id").map_err(decode)?;
    let lines: serde_json::Value = row.try_get("lines").map_err(decode)?;
    let lines: Vec<OrderLine> = serde_json::from_value(lines)
        .map_err(|e| StoreError::Corrupt(format!("order {id} has unreadable lines: {e}")))?;
    let total: i64 = row.try_get("total_amount").map_err(decode)?;
    let payment_method: String = row.try_get("payment_method").map_err(decode)?;
    let status: String = row.try_get("status").map_err(decode)?;

    Order::rehydrate(
        OrderId::from_uuid(id),
        UserId::from_uuid(row.try_get("user_id").map_err(decode)?),
        lines,
        from_i64(total, "order total")?,
        row.try_get("shipping_address").map_err(decode)?,
        row.try_get("phone").map_err(decode)?,
        parse_column::<PaymentMethod>(&payment_method, "payment method")?,
        row.try_get("payment_details").map_err(decode)?,
        parse_column::<OrderStatus>(&status, "order status")?,
        row.try_get("created_at").map_err(decode)?,
        row.try_get("updated_at").map_err(decode)?,
    )
    .map_err(|e| StoreError::Corrupt(e.to_string()))
}

fn user_from_row(row: &PgRow) -> StoreResult<User> {
    let decode = |e| map_sqlx_error("decode_user", e);
    let role: String = row.try_get("role").map_err(decode)?;
    Ok(User {
        id: UserId::from_uuid(row.try_get("id").map_err(decode)?),
        uid: row.try_get("uid").map_err(decode)?,
        email: row.try_get("email").map_err(decode)?,
        display_name: row.try_get("display_name").map_err(decode)?,
        role: parse_column::<Role>(&role, "role")?,
        created_at: row.try_get("created_at").map_err(decode)?,
    })
}

fn notification_from_row(row: &PgRow) -> StoreResult<Notification> {
    let decode = |e| map_sqlx_error("decode_notification", e);
    let kind: String = row.try_get("kind").map_err(decode)?;
    Ok(Notification::rehydrate(
        NotificationId::from_uuid(row.try_get("id").map_err(decode)?),
        UserId::from_uuid(row.try_get("user_id").map_err(decode)?),
        parse_column::<NotificationKind>(&kind, "notification kind")?,
        row.try_get("title").map_err(decode)?,
        row.try_get("message").map_err(decode)?,
        row.try_get("data").map_err(decode)?,
        row.try_get("is_read").map_err(decode)?,
        row.try_get("created_at").map_err(decode)?,
    ))
}

fn wishlist_from_row(row: &PgRow) -> StoreResult<WishlistEntry> {
    let decode = |e| map_sqlx_error("decode_wishlist", e);
    Ok(WishlistEntry {
        user_id: UserId::from_uuid(row.try_get("user_id").map_err(decode)?),
        product_id: ProductId::from_uuid(row.try_get("product_id").map_err(decode)?),
        created_at: row.try_get("created_at").map_err(decode)?,
    })
}

fn restock_request_from_row(row: &PgRow) -> StoreResult<RestockRequest> {
    let decode = |e| map_sqlx_error("decode_restock_request", e);
    let status: String = row.try_get("status").map_err(decode)?;
    Ok(RestockRequest {
        id: RestockRequestId::from_uuid(row.try_get("id").map_err(decode)?),
        user_id: UserId::from_uuid(row.try_get("user_id").map_err(decode)?),
        product_id: ProductId::from_uuid(row.try_get("product_id").map_err(decode)?),
        variation: selector_from_json(row.try_get("variation").map_err(decode)?)?,
        status: parse_column::<RestockStatus>(&status, "restock status")?,
        created_at: row.try_get("created_at").map_err(decode)?,
    })
}
