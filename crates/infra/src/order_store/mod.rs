//! Order persistence.

pub mod in_memory;
pub mod postgres;

pub use in_memory::InMemoryOrderRepository;
pub use postgres::PostgresOrderRepository;

use std::sync::Arc;

use stockline_core::OrderId;
use stockline_orders::{NewOrder, Order};

use crate::StoreError;

#[async_trait::async_trait]
pub trait OrderRepository: Send + Sync {
    /// Persist a new order. The repository assigns the order id.
    async fn save(&self, order: NewOrder) -> Result<Order, StoreError>;

    async fn get(&self, order_id: OrderId) -> Result<Option<Order>, StoreError>;
}

#[async_trait::async_trait]
impl<R> OrderRepository for Arc<R>
where
    R: OrderRepository + ?Sized,
{
    async fn save(&self, order: NewOrder) -> Result<Order, StoreError> {
        (**self).save(order).await
    }

    async fn get(&self, order_id: OrderId) -> Result<Option<Order>, StoreError> {
        (**self).get(order_id).await
    }
}
