use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{info, instrument, warn};

use gadgetbazar_auth::User;
use gadgetbazar_catalog::Product;
use gadgetbazar_core::{DomainError, DomainResult, OrderId, ProductId, Resource, UserId};
use gadgetbazar_orders::{Order, OrderLine, OrderStatus, Page, PageRequest, PlaceOrder};

use super::ServiceResult;
use crate::store::Store;

/// Current catalog state of a product referenced by an order line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSummary {
    pub id: ProductId,
    pub name: String,
    pub stock_quantity: u32,
    pub in_stock: bool,
}

impl From<&Product> for ProductSummary {
    fn from(p: &Product) -> Self {
        Self {
            id: p.id(),
            name: p.name().to_string(),
            stock_quantity: p.stock_quantity(),
            in_stock: p.in_stock(),
        }
    }
}

/// An order plus, per line, the product as it is now (`None` once deleted).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderView {
    #[serde(flatten)]
    pub order: Order,
    pub current_products: Vec<Option<ProductSummary>>,
}

#[derive(Clone)]
pub struct OrderWorkflow {
    store: Arc<dyn Store>,
}

impl OrderWorkflow {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Price, reserve and record an order for `user`.
    ///
    /// Fails with `Validation`, `NotFound` or `InsufficientStock` before any
    /// write, or with `InsufficientStock` from the commit when stock ran out
    /// in between. Either way nothing is persisted.
    #[instrument(skip(self, user, request), fields(user_id = %user.id, items = request.items.len()), err)]
    pub async fn place_order(&self, user: &User, request: PlaceOrder) -> ServiceResult<Order> {
        request.validate()?;
        let items = request.merged_items()?;

        let ids = unique_ids(items.iter().map(|i| i.product_id));
        let products = by_id(self.store.products_by_ids(&ids).await?);

        let lines = items
            .iter()
            .map(|item| {
                let product = products
                    .get(&item.product_id)
                    .ok_or_else(|| DomainError::not_found(Resource::Product, item.product_id))?;
                OrderLine::price(product, item)
            })
            .collect::<DomainResult<Vec<_>>>()?;

        let now = Utc::now();
        let order = Order::place(OrderId::new(), user.id, &request, lines, now)?;
        let notified = self.store.commit_order(&order, user.label(), now).await?;

        if let Err(e) = self.store.clear_cart(user.id).await {
            warn!(order_id = %order.id(), error = %e, "order committed but cart clear failed");
        }

        info!(
            order_id = %order.id(),
            total = order.total_amount(),
            lines = order.lines().len(),
            admins_notified = notified.len(),
            "order placed"
        );
        Ok(order)
    }

    pub async fn list_for_user(&self, user_id: UserId) -> ServiceResult<Vec<OrderView>> {
        let orders = self.store.orders_for_user(user_id).await?;
        self.enrich(orders).await
    }

    /// Orders owned by someone else are reported as missing.
    pub async fn get_for_user(&self, user_id: UserId, order_id: OrderId) -> ServiceResult<OrderView> {
        let order = self.owned_order(user_id, order_id).await?;
        let mut views = self.enrich(vec![order]).await?;
        views
            .pop()
            .ok_or_else(|| DomainError::not_found(Resource::Order, order_id).into())
    }

    pub async fn delete_for_user(&self, user_id: UserId, order_id: OrderId) -> ServiceResult<()> {
        self.owned_order(user_id, order_id).await?;
        self.delete(order_id).await
    }

    /// Admin listing, newest first.
    pub async fn list(
        &self,
        page: PageRequest,
        status: Option<OrderStatus>,
    ) -> ServiceResult<Page<OrderView>> {
        let page = page.normalized();
        let (orders, total) = self.store.list_orders(page, status).await?;
        Ok(Page {
            items: self.enrich(orders).await?,
            pagination: page.info(total),
        })
    }

    /// Set a new status. The owner is notified only when the status actually changes.
    #[instrument(skip(self), fields(order_id = %order_id, status = %status), err)]
    pub async fn update_status(&self, order_id: OrderId, status: OrderStatus) -> ServiceResult<Order> {
        let update = self
            .store
            .update_order_status(order_id, status, Utc::now())
            .await?
            .ok_or_else(|| DomainError::not_found(Resource::Order, order_id))?;
        if update.notification.is_some() {
            info!(order_id = %order_id, status = %status, "order status changed; owner notified");
        }
        Ok(update.order)
    }

    pub async fn delete(&self, order_id: OrderId) -> ServiceResult<()> {
        if !self.store.delete_order(order_id).await? {
            return Err(DomainError::not_found(Resource::Order, order_id).into());
        }
        info!(order_id = %order_id, "order deleted");
        Ok(())
    }

    async fn owned_order(&self, user_id: UserId, order_id: OrderId) -> ServiceResult<Order> {
        match self.store.get_order(order_id).await? {
            Some(order) if order.user_id() == user_id => Ok(order),
            _ => Err(DomainError::not_found(Resource::Order, order_id).into()),
        }
    }

    async fn enrich(&self, orders: Vec<Order>) -> ServiceResult<Vec<OrderView>> {
        let ids = unique_ids(
            orders
                .iter()
                .flat_map(|o| o.lines().iter().map(OrderLine::product_id)),
        );
        let products = by_id(self.store.products_by_ids(&ids).await?);

        Ok(orders
            .into_iter()
            .map(|order| {
                let current_products = order
                    .lines()
                    .iter()
                    .map(|line| products.get(&line.product_id()).map(ProductSummary::from))
                    .collect();
                OrderView {
                    order,
                    current_products,
                }
            })
            .collect())
    }
}

fn unique_ids(ids: impl Iterator<Item = ProductId>) -> Vec<ProductId> {
    let mut seen = HashSet::new();
    ids.filter(|id| seen.insert(*id)).collect()
}

fn by_id(products: Vec<Product>) -> HashMap<ProductId, Product> {
    products.into_iter().map(|p| (p.id(), p)).collect()
}
