//! Postgres-backed inventory store.
//!
//! Every deduction entry locks its batch row with `SELECT ... FOR UPDATE` before
//! checking the quantity, so two writers can never both draw the last units of
//! a batch. `PerBatch` commits one transaction per entry; `AllOrNothing` runs
//! the whole request in a single transaction. Reservation markers are claimed
//! in the same transaction before the batch is touched.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::NaiveDate;
use sqlx::{PgConnection, PgPool, Row};
use tracing::{debug, instrument};

use stockline_core::{BatchId, ProductId, ReservationId};
use stockline_inventory::{
    deduct, Batch, BatchDeduction, DeductionError, DeductionMode, DeductionRequest, ProductStock, StockLookup,
};

use super::{DeductionOutcome, InventoryStore};
use crate::error::map_sqlx_error;
use crate::seed::InventorySeed;
use crate::StoreError;

#[derive(Debug, Clone)]
pub struct PostgresInventoryStore {
    pool: Arc<PgPool>,
    mode: DeductionMode,
}

impl PostgresInventoryStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
            mode: DeductionMode::default(),
        }
    }

    pub fn with_mode(mut self, mode: DeductionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Upsert the products and batches of a seed document.
    ///
    /// Existing batch quantities are overwritten, so this is meant for empty or
    /// disposable databases.
    #[instrument(skip(self, seed), fields(products = seed.products.len()), err)]
    pub async fn load_seed(&self, seed: &InventorySeed) -> Result<(), StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("load_seed", e))?;

        for product in &seed.products {
            sqlx::query(
                r#"
                INSERT INTO products (product_id, product_name)
                VALUES ($1, $2)
                ON CONFLICT (product_id) DO UPDATE SET product_name = EXCLUDED.product_name
                "#,
            )
            .bind(product.product_id.get())
            .bind(&product.product_name)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("load_seed", e))?;

            for batch in &product.batches {
                sqlx::query(
                    r#"
                    INSERT INTO inventory_batches (batch_id, product_id, quantity, expiry_date)
                    VALUES ($1, $2, $3, $4)
                    ON CONFLICT (batch_id) DO UPDATE
                        SET product_id = EXCLUDED.product_id,
                            quantity = EXCLUDED.quantity,
                            expiry_date = EXCLUDED.expiry_date
                    "#,
                )
                .bind(batch.batch_id.get())
                .bind(product.product_id.get())
                .bind(batch.quantity)
                .bind(batch.expiry_date)
                .execute(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("load_seed", e))?;
            }
        }

        tx.commit().await.map_err(|e| map_sqlx_error("load_seed", e))
    }

    /// Claim the `(reservation, batch)` marker inside the entry's transaction.
    ///
    /// Returns `false` when the marker already exists, i.e. the entry is a
    /// replay. A concurrent copy of the same reservation blocks on the marker's
    /// primary key until the first one commits or rolls back, so at most one of
    /// them ever reaches the batch row.
    async fn claim_reservation(
        conn: &mut PgConnection,
        reservation_id: Option<ReservationId>,
        batch_id: BatchId,
    ) -> Result<bool, StoreError> {
        let Some(rid) = reservation_id else {
            return Ok(true);
        };

        let result = sqlx::query(
            r#"
            INSERT INTO applied_reservations (reservation_id, batch_id, quantity)
            VALUES ($1, $2, 0)
            ON CONFLICT (reservation_id, batch_id) DO NOTHING
            "#,
        )
        .bind(rid.as_uuid())
        .bind(batch_id.get())
        .execute(&mut *conn)
        .await
        .map_err(|e| map_sqlx_error("claim_reservation", e))?;

        Ok(result.rows_affected() == 1)
    }

    /// Lock the batch row, check the quantity, write the new value.
    async fn apply_entry(
        conn: &mut PgConnection,
        reservation_id: Option<ReservationId>,
        entry: &BatchDeduction,
    ) -> Result<(), StoreError> {
        let row = sqlx::query(
            r#"
            SELECT quantity
            FROM inventory_batches
            WHERE batch_id = $1
            FOR UPDATE
            "#,
        )
        .bind(entry.batch_id.get())
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| map_sqlx_error("apply_entry", e))?;

        let Some(row) = row else {
            return Err(DeductionError::BatchNotFound(entry.batch_id).into());
        };
        let available: i64 = row
            .try_get("quantity")
            .map_err(|e| StoreError::storage(format!("failed to read batch quantity: {}", e)))?;

        let remaining = deduct(entry.batch_id, available, entry.quantity_to_deduct)?;

        sqlx::query("UPDATE inventory_batches SET quantity = $1 WHERE batch_id = $2")
            .bind(remaining)
            .bind(entry.batch_id.get())
            .execute(&mut *conn)
            .await
            .map_err(|e| map_sqlx_error("apply_entry", e))?;

        if let Some(rid) = reservation_id {
            sqlx::query(
                r#"
                UPDATE applied_reservations
                SET quantity = quantity + $3
                WHERE reservation_id = $1 AND batch_id = $2
                "#,
            )
            .bind(rid.as_uuid())
            .bind(entry.batch_id.get())
            .bind(entry.quantity_to_deduct)
            .execute(&mut *conn)
            .await
            .map_err(|e| map_sqlx_error("apply_entry", e))?;
        }

        Ok(())
    }

    async fn apply_per_batch(&self, request: &DeductionRequest) -> Result<DeductionOutcome, StoreError> {
        let mut outcome = DeductionOutcome::default();
        let mut touched: HashSet<BatchId> = HashSet::new();

        for entry in &request.batch_updates {
            let mut tx = self
                .pool
                .begin()
                .await
                .map_err(|e| map_sqlx_error("apply_per_batch", e))?;

            if !touched.contains(&entry.batch_id)
                && !Self::claim_reservation(&mut tx, request.reservation_id, entry.batch_id).await?
            {
                outcome.replayed += 1;
                continue;
            }

            Self::apply_entry(&mut tx, request.reservation_id, entry).await?;
            tx.commit()
                .await
                .map_err(|e| map_sqlx_error("apply_per_batch", e))?;

            touched.insert(entry.batch_id);
            outcome.applied += 1;
        }

        Ok(outcome)
    }

    async fn apply_all_or_nothing(&self, request: &DeductionRequest) -> Result<DeductionOutcome, StoreError> {
        let mut outcome = DeductionOutcome::default();
        let mut touched: HashSet<BatchId> = HashSet::new();

        // Dropping the transaction on an early return rolls everything back.
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("apply_all_or_nothing", e))?;

        for entry in &request.batch_updates {
            if !touched.contains(&entry.batch_id)
                && !Self::claim_reservation(&mut tx, request.reservation_id, entry.batch_id).await?
            {
                outcome.replayed += 1;
                continue;
            }

            Self::apply_entry(&mut tx, request.reservation_id, entry).await?;
            touched.insert(entry.batch_id);
            outcome.applied += 1;
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("apply_all_or_nothing", e))?;
        Ok(outcome)
    }
}

#[async_trait::async_trait]
impl InventoryStore for PostgresInventoryStore {
    #[instrument(skip(self), fields(product_id = %product_id), err)]
    async fn stock_by_expiry(&self, product_id: ProductId) -> Result<StockLookup, StoreError> {
        let product = sqlx::query("SELECT product_name FROM products WHERE product_id = $1")
            .bind(product_id.get())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("stock_by_expiry", e))?;

        let Some(product) = product else {
            return Ok(StockLookup::NotFound);
        };
        let product_name: String = product
            .try_get("product_name")
            .map_err(|e| StoreError::storage(format!("failed to read product row: {}", e)))?;

        let rows = sqlx::query(
            r#"
            SELECT batch_id, quantity, expiry_date
            FROM inventory_batches
            WHERE product_id = $1
            ORDER BY expiry_date ASC, batch_id ASC
            "#,
        )
        .bind(product_id.get())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("stock_by_expiry", e))?;

        if rows.is_empty() {
            return Ok(StockLookup::NotFound);
        }

        let mut batches = Vec::with_capacity(rows.len());
        for row in rows {
            let batch_id: i64 = row
                .try_get("batch_id")
                .map_err(|e| StoreError::storage(format!("failed to read batch row: {}", e)))?;
            let quantity: i64 = row
                .try_get("quantity")
                .map_err(|e| StoreError::storage(format!("failed to read batch row: {}", e)))?;
            let expiry_date: NaiveDate = row
                .try_get("expiry_date")
                .map_err(|e| StoreError::storage(format!("failed to read batch row: {}", e)))?;
            batches.push(Batch::new(BatchId::new(batch_id), quantity, expiry_date));
        }

        Ok(StockLookup::Found(ProductStock {
            product_id,
            product_name,
            batches,
        }))
    }

    #[instrument(
        skip(self, request),
        fields(
            product_id = %request.product_id,
            entries = request.batch_updates.len(),
            mode = %self.mode
        ),
        err
    )]
    async fn apply_deductions(&self, request: &DeductionRequest) -> Result<DeductionOutcome, StoreError> {
        if request.is_empty() {
            return Ok(DeductionOutcome::default());
        }

        let outcome = match self.mode {
            DeductionMode::PerBatch => self.apply_per_batch(request).await?,
            DeductionMode::AllOrNothing => self.apply_all_or_nothing(request).await?,
        };

        debug!(applied = outcome.applied, replayed = outcome.replayed, "deductions applied");
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    use crate::db;
    use crate::seed::SeedProduct;

    /// These tests need a disposable Postgres; they do nothing unless
    /// `STOCKLINE_TEST_DATABASE_URL` is set.
    async fn test_store(mode: DeductionMode) -> Option<PostgresInventoryStore> {
        let url = std::env::var("STOCKLINE_TEST_DATABASE_URL").ok()?;
        let pool = db::connect(&url).await.unwrap();
        Some(PostgresInventoryStore::new(pool).with_mode(mode))
    }

    /// Seed one product with a single batch of 10 and return their ids.
    async fn seed_single_batch(store: &PostgresInventoryStore, salt: i64) -> (ProductId, BatchId) {
        let base = Utc::now().timestamp_micros() * 10 + salt;
        let product_id = ProductId::new(base);
        let batch_id = BatchId::new(base);
        let seed = InventorySeed {
            products: vec![SeedProduct {
                product_id,
                product_name: "Thermometer".to_string(),
                batches: vec![Batch::new(
                    batch_id,
                    10,
                    NaiveDate::from_ymd_opt(2027, 1, 31).unwrap(),
                )],
            }],
        };
        store.load_seed(&seed).await.unwrap();
        (product_id, batch_id)
    }

    async fn quantity(store: &PostgresInventoryStore, product_id: ProductId) -> i64 {
        store
            .stock_by_expiry(product_id)
            .await
            .unwrap()
            .found()
            .unwrap()
            .batches[0]
            .quantity
    }

    async fn concurrent_copies_of_a_reservation_deduct_once(mode: DeductionMode, salt: i64) {
        let Some(store) = test_store(mode).await else {
            return;
        };
        let (product_id, batch_id) = seed_single_batch(&store, salt).await;
        let request = DeductionRequest::new(product_id, vec![BatchDeduction::new(batch_id, 4)])
            .with_reservation(ReservationId::new());

        let (first, second) = tokio::join!(store.apply_deductions(&request), store.apply_deductions(&request));
        let first = first.unwrap();
        let second = second.unwrap();

        assert_eq!(first.applied + second.applied, 1);
        assert_eq!(first.replayed + second.replayed, 1);
        assert_eq!(quantity(&store, product_id).await, 6);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_replay_is_applied_once_per_batch_mode() {
        concurrent_copies_of_a_reservation_deduct_once(DeductionMode::PerBatch, 1).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_replay_is_applied_once_all_or_nothing_mode() {
        concurrent_copies_of_a_reservation_deduct_once(DeductionMode::AllOrNothing, 2).await;
    }

    #[tokio::test]
    async fn failed_entry_releases_its_reservation_marker() {
        let Some(store) = test_store(DeductionMode::PerBatch).await else {
            return;
        };
        let (product_id, batch_id) = seed_single_batch(&store, 3).await;
        let rid = ReservationId::new();

        let too_much = DeductionRequest::new(product_id, vec![BatchDeduction::new(batch_id, 11)]).with_reservation(rid);
        assert!(store.apply_deductions(&too_much).await.is_err());

        let retry = DeductionRequest::new(product_id, vec![BatchDeduction::new(batch_id, 10)]).with_reservation(rid);
        let outcome = store.apply_deductions(&retry).await.unwrap();
        assert_eq!(outcome, DeductionOutcome { applied: 1, replayed: 0 });
        assert_eq!(quantity(&store, product_id).await, 0);
    }

    #[tokio::test]
    async fn product_without_batches_is_not_found() {
        let Some(store) = test_store(DeductionMode::PerBatch).await else {
            return;
        };
        let product_id = ProductId::new(Utc::now().timestamp_micros() * 10 + 4);
        let seed = InventorySeed {
            products: vec![SeedProduct {
                product_id,
                product_name: "Tablet".to_string(),
                batches: Vec::new(),
            }],
        };
        store.load_seed(&seed).await.unwrap();

        assert_eq!(store.stock_by_expiry(product_id).await.unwrap(), StockLookup::NotFound);
    }
}
