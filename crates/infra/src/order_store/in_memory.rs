use std::collections::BTreeMap;
use std::sync::RwLock;

use stockline_core::OrderId;
use stockline_orders::{NewOrder, Order};

use super::OrderRepository;
use crate::StoreError;

#[derive(Debug, Default)]
struct Orders {
    last_id: i64,
    by_id: BTreeMap<OrderId, Order>,
}

/// In-memory order repository. Ids are assigned sequentially from 1.
#[derive(Debug, Default)]
pub struct InMemoryOrderRepository {
    inner: RwLock<Orders>,
}

impl InMemoryOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// All stored orders, by id.
    pub fn all(&self) -> Result<Vec<Order>, StoreError> {
        let orders = self
            .inner
            .read()
            .map_err(|_| StoreError::storage("lock poisoned"))?;
        Ok(orders.by_id.values().cloned().collect())
    }
}

#[async_trait::async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn save(&self, order: NewOrder) -> Result<Order, StoreError> {
        let mut orders = self
            .inner
            .write()
            .map_err(|_| StoreError::storage("lock poisoned"))?;

        orders.last_id += 1;
        let order = order.into_order(OrderId::new(orders.last_id));
        orders.by_id.insert(order.order_id, order.clone());
        Ok(order)
    }

    async fn get(&self, order_id: OrderId) -> Result<Option<Order>, StoreError> {
        let orders = self
            .inner
            .read()
            .map_err(|_| StoreError::storage("lock poisoned"))?;
        Ok(orders.by_id.get(&order_id).cloned())
    }
}
