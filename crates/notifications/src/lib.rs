//! Notifications domain module.
//!
//! The notification record, subscriber records (wishlist, restock requests) and
//! pure planners that turn a committed state transition into notifications.

pub mod fanout;
pub mod notification;
pub mod subscription;

pub use fanout::{
    ProductFanOut, new_order_notifications, order_status_notification, plan_product_fanout,
    product_list_summary,
};
pub use notification::{Notification, NotificationKind};
pub use subscription::{RestockRequest, RestockStatus, WishlistEntry};
