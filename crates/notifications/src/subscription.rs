//! Subscriber records: wishlists and restock requests.

use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use gadgetbazar_catalog::{Product, VariationSelector};
use gadgetbazar_core::{DomainError, DomainResult, ProductId, RestockRequestId, UserId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistEntry {
    pub user_id: UserId,
    pub product_id: ProductId,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RestockStatus {
    Pending,
    Restocked,
}

impl RestockStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RestockStatus::Pending => "pending",
            RestockStatus::Restocked => "restocked",
        }
    }
}

impl FromStr for RestockStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(RestockStatus::Pending),
            "restocked" => Ok(RestockStatus::Restocked),
            other => Err(DomainError::validation(format!(
                "unknown restock request status: {other}"
            ))),
        }
    }
}

/// "Tell me when this is back" for one product, optionally one variation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestockRequest {
    pub id: RestockRequestId,
    pub user_id: UserId,
    pub product_id: ProductId,
    pub variation: Option<VariationSelector>,
    pub status: RestockStatus,
    pub created_at: DateTime<Utc>,
}

impl RestockRequest {
    /// Open a request. Only allowed while the requested stock is exhausted.
    pub fn open(
        user_id: UserId,
        product: &Product,
        variation: Option<VariationSelector>,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let available = if product.in_stock() {
            product.available(variation.as_ref())?
        } else {
            if let Some(sel) = &variation {
                if product.variation(sel).is_none() {
                    return Err(DomainError::validation(format!(
                        "unknown variation {sel} for product {}",
                        product.name()
                    )));
                }
            }
            0
        };
        if available > 0 {
            return Err(DomainError::validation(format!(
                "{} is in stock; restock requests are only accepted for unavailable items",
                product.name()
            )));
        }

        Ok(Self {
            id: RestockRequestId::new(),
            user_id,
            product_id: product.id(),
            variation,
            status: RestockStatus::Pending,
            created_at: now,
        })
    }

    pub fn is_pending(&self) -> bool {
        self.status == RestockStatus::Pending
    }
}
