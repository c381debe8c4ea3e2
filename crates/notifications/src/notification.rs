use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use gadgetbazar_core::{DomainError, NotificationId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    NewOrder,
    Restock,
    RestockComplete,
    PriceDrop,
    OrderStatus,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::NewOrder => "new_order",
            NotificationKind::Restock => "restock",
            NotificationKind::RestockComplete => "restock_complete",
            NotificationKind::PriceDrop => "price_drop",
            NotificationKind::OrderStatus => "order_status",
        }
    }
}

impl FromStr for NotificationKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new_order" => Ok(NotificationKind::NewOrder),
            "restock" => Ok(NotificationKind::Restock),
            "restock_complete" => Ok(NotificationKind::RestockComplete),
            "price_drop" => Ok(NotificationKind::PriceDrop),
            "order_status" => Ok(NotificationKind::OrderStatus),
            other => Err(DomainError::validation(format!(
                "unknown notification kind: {other}"
            ))),
        }
    }
}

/// A message addressed to one user.
///
/// Only the read flag ever changes after creation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    id: NotificationId,
    user_id: UserId,
    #[serde(rename = "type")]
    kind: NotificationKind,
    title: String,
    message: String,
    data: serde_json::Value,
    is_read: bool,
    created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(
        user_id: UserId,
        kind: NotificationKind,
        title: impl Into<String>,
        message: impl Into<String>,
        data: serde_json::Value,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: NotificationId::new(),
            user_id,
            kind,
            title: title.into(),
            message: message.into(),
            data,
            is_read: false,
            created_at: now,
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn rehydrate(
        id: NotificationId,
        user_id: UserId,
        kind: NotificationKind,
        title: String,
        message: String,
        data: serde_json::Value,
        is_read: bool,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user_id,
            kind,
            title,
            message,
            data,
            is_read,
            created_at,
        }
    }

    pub fn id(&self) -> NotificationId {
        self.id
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn kind(&self) -> NotificationKind {
        self.kind
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn data(&self) -> &serde_json::Value {
        &self.data
    }

    pub fn is_read(&self) -> bool {
        self.is_read
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn mark_read(&mut self) {
        self.is_read = true;
    }
}
