use std::sync::Arc;

use serde::Serialize;

use gadgetbazar_orders::{Order, PageRequest};

use super::ServiceResult;
use crate::store::{DashboardCounts, Store};

const RECENT_ORDERS: u32 = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    #[serde(flatten)]
    pub counts: DashboardCounts,
    pub recent_orders: Vec<Order>,
}

/// Admin overview.
#[derive(Clone)]
pub struct Dashboard {
    store: Arc<dyn Store>,
}

impl Dashboard {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn stats(&self) -> ServiceResult<DashboardStats> {
        let counts = self.store.dashboard_counts().await?;
        let (recent_orders, _) = self
            .store
            .list_orders(PageRequest::new(1, RECENT_ORDERS), None)
            .await?;
        Ok(DashboardStats {
            counts,
            recent_orders,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::services::OrderWorkflow;
    use crate::services::test_support::*;
    use crate::store::InMemoryStore;

    #[tokio::test]
    async fn stats_count_everything_and_cap_recent_orders() {
        let store = Arc::new(InMemoryStore::new());
        admin(&store, "admin").await;
        let shopper = customer(&store, "shopper").await;
        let p = simple_product(&store, "Memory Card", 900, 50).await;
        simple_product(&store, "Card Reader", 400, 5).await;

        let workflow = OrderWorkflow::new(store.clone());
        for _ in 0..7 {
            workflow
                .place_order(&shopper, place(vec![item(p.id(), 1)]))
                .await
                .unwrap();
        }

        let stats = Dashboard::new(store).stats().await.unwrap();
        assert_eq!(stats.counts.total_products, 2);
        assert_eq!(stats.counts.total_orders, 7);
        assert_eq!(stats.counts.total_users, 2);
        assert_eq!(stats.recent_orders.len(), 5);
    }
}
