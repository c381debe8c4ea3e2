//! Pure fan-out planners.
//!
//! Each planner takes a state transition that has already been computed and
//! returns the notifications it implies. Persisting them is the caller's job,
//! in the same transaction as the transition itself.

use chrono::{DateTime, Utc};
use serde_json::json;

use gadgetbazar_catalog::Product;
use gadgetbazar_core::{RestockRequestId, UserId};
use gadgetbazar_orders::{Order, StatusChange};

use crate::notification::{Notification, NotificationKind};
use crate::subscription::{RestockRequest, WishlistEntry};

/// One `new_order` notification per admin.
pub fn new_order_notifications(
    order: &Order,
    customer_label: &str,
    admins: &[UserId],
    now: DateTime<Utc>,
) -> Vec<Notification> {
    let message = format!(
        "Order #{} placed by {} - BDT {}",
        order.id(),
        customer_label,
        order.total_amount()
    );
    admins
        .iter()
        .map(|admin| {
            Notification::new(
                *admin,
                NotificationKind::NewOrder,
                "New Order Received",
                message.clone(),
                json!({ "orderId": order.id() }),
                now,
            )
        })
        .collect()
}

/// Up to two names joined by `, `, then ` +N more`. Missing products render as `Product`.
pub fn product_list_summary(names: &[Option<String>]) -> String {
    let shown: Vec<&str> = names
        .iter()
        .take(2)
        .map(|n| n.as_deref().unwrap_or("Product"))
        .collect();
    let mut summary = shown.join(", ");
    if names.len() > 2 {
        summary.push_str(&format!(" +{} more", names.len() - 2));
    }
    summary
}

/// Notification to the order owner after a real status change.
///
/// `current_names` holds the current catalog name of each line's product, in line order.
pub fn order_status_notification(
    order: &Order,
    change: StatusChange,
    current_names: &[Option<String>],
    now: DateTime<Utc>,
) -> Notification {
    Notification::new(
        order.user_id(),
        NotificationKind::OrderStatus,
        "Order Status Updated",
        format!(
            "{}: {}",
            product_list_summary(current_names),
            change.to.customer_message()
        ),
        json!({ "orderId": order.id(), "status": change.to }),
        now,
    )
}

/// Output of [`plan_product_fanout`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductFanOut {
    pub notifications: Vec<Notification>,
    /// Pending requests that must be flipped to `restocked`.
    pub restocked_requests: Vec<RestockRequestId>,
}

impl ProductFanOut {
    pub fn is_empty(&self) -> bool {
        self.notifications.is_empty() && self.restocked_requests.is_empty()
    }
}

/// Plan notifications for an admin edit of one product.
///
/// Price drop: `price_drop` to every wishlist holder. Out-of-stock to
/// in-stock edge: `restock_complete` per pending request and `restock` per
/// wishlist holder. Nothing else triggers anything.
pub fn plan_product_fanout(
    before: &Product,
    after: &Product,
    wishlist: &[WishlistEntry],
    restock_requests: &[RestockRequest],
    now: DateTime<Utc>,
) -> ProductFanOut {
    let mut out = ProductFanOut::default();
    let product_id = after.id();

    if after.price() < before.price() {
        let message = format!(
            "{} price dropped from BDT {} to BDT {}",
            after.name(),
            before.price(),
            after.price()
        );
        for entry in wishlist.iter().filter(|w| w.product_id == product_id) {
            out.notifications.push(Notification::new(
                entry.user_id,
                NotificationKind::PriceDrop,
                "Price Drop Alert!",
                message.clone(),
                json!({
                    "productId": product_id,
                    "oldPrice": before.price(),
                    "newPrice": after.price(),
                }),
                now,
            ));
        }
    }

    if !before.in_stock() && after.in_stock() {
        for request in restock_requests
            .iter()
            .filter(|r| r.product_id == product_id && r.is_pending())
        {
            let variation_text = request
                .variation
                .as_ref()
                .map(|sel| format!(" ({})", sel.color))
                .unwrap_or_default();
            out.notifications.push(Notification::new(
                request.user_id,
                NotificationKind::RestockComplete,
                "Product Back in Stock!",
                format!(
                    "{}{} is now available. Order now before it runs out again!",
                    after.name(),
                    variation_text
                ),
                json!({ "productId": product_id }),
                now,
            ));
            out.restocked_requests.push(request.id);
        }

        for entry in wishlist.iter().filter(|w| w.product_id == product_id) {
            out.notifications.push(Notification::new(
                entry.user_id,
                NotificationKind::Restock,
                "Wishlist Item Back in Stock!",
                format!("{} from your wishlist is now available!", after.name()),
                json!({ "productId": product_id }),
                now,
            ));
        }
    }

    out
}
