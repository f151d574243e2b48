use std::sync::Arc;

use chrono::NaiveDate;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::instrument;

use stockline_core::{BatchId, OrderId, ProductId};
use stockline_orders::{NewOrder, Order, OrderStatus};

use super::OrderRepository;
use crate::error::map_sqlx_error;
use crate::StoreError;

/// Postgres-backed order repository. Order ids come from a `BIGSERIAL`.
#[derive(Debug, Clone)]
pub struct PostgresOrderRepository {
    pool: Arc<PgPool>,
}

impl PostgresOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool: Arc::new(pool) }
    }

    fn order_from_row(row: &PgRow) -> Result<Order, StoreError> {
        let bad_row = |e: sqlx::Error| StoreError::storage(format!("failed to read order row: {}", e));

        let status: String = row.try_get("status").map_err(bad_row)?;
        let status: OrderStatus = status
            .parse()
            .map_err(|e| StoreError::storage(format!("{}", e)))?;
        let reserved: Vec<i64> = row.try_get("reserved_batch_ids").map_err(bad_row)?;

        Ok(Order {
            order_id: OrderId::new(row.try_get("order_id").map_err(bad_row)?),
            product_id: ProductId::new(row.try_get("product_id").map_err(bad_row)?),
            product_name: row.try_get("product_name").map_err(bad_row)?,
            quantity: row.try_get("quantity").map_err(bad_row)?,
            status,
            order_date: row.try_get::<NaiveDate, _>("order_date").map_err(bad_row)?,
            reserved_batch_ids: reserved.into_iter().map(BatchId::new).collect(),
        })
    }
}

#[async_trait::async_trait]
impl OrderRepository for PostgresOrderRepository {
    #[instrument(skip(self, order), fields(product_id = %order.product_id, quantity = order.quantity), err)]
    async fn save(&self, order: NewOrder) -> Result<Order, StoreError> {
        let reserved: Vec<i64> = order.reserved_batch_ids.iter().map(|id| id.get()).collect();

        let row = sqlx::query(
            r#"
            INSERT INTO orders (product_id, product_name, quantity, status, order_date, reserved_batch_ids)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING order_id
            "#,
        )
        .bind(order.product_id.get())
        .bind(&order.product_name)
        .bind(order.quantity)
        .bind(order.status.as_str())
        .bind(order.order_date)
        .bind(&reserved)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("save_order", e))?;

        let order_id: i64 = row
            .try_get("order_id")
            .map_err(|e| StoreError::storage(format!("failed to read order id: {}", e)))?;

        Ok(order.into_order(OrderId::new(order_id)))
    }

    #[instrument(skip(self), fields(order_id = %order_id), err)]
    async fn get(&self, order_id: OrderId) -> Result<Option<Order>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT order_id, product_id, product_name, quantity, status, order_date, reserved_batch_ids
            FROM orders
            WHERE order_id = $1
            "#,
        )
        .bind(order_id.get())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_order", e))?;

        row.as_ref().map(Self::order_from_row).transpose()
    }
}
