use std::collections::{HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::debug;

use stockline_core::{BatchId, ProductId, ReservationId};
use stockline_inventory::{
    deduct, Batch, DeductionError, DeductionMode, DeductionRequest, ProductStock, StockLookup,
};

use super::{DeductionOutcome, InventoryStore};
use crate::seed::InventorySeed;
use crate::StoreError;

#[derive(Debug, Clone)]
struct StoredBatch {
    product_id: ProductId,
    batch: Batch,
}

#[derive(Debug, Default)]
struct Inventory {
    products: HashMap<ProductId, String>,
    batches: HashMap<BatchId, StoredBatch>,
    applied: HashSet<(ReservationId, BatchId)>,
}

impl Inventory {
    fn stock(&self, product_id: ProductId) -> StockLookup {
        let Some(product_name) = self.products.get(&product_id) else {
            return StockLookup::NotFound;
        };

        let mut batches: Vec<Batch> = self
            .batches
            .values()
            .filter(|stored| stored.product_id == product_id)
            .map(|stored| stored.batch.clone())
            .collect();
        if batches.is_empty() {
            return StockLookup::NotFound;
        }
        // HashMap iteration order is arbitrary; break expiry ties by id.
        batches.sort_by_key(|b| (b.expiry_date, b.batch_id));

        StockLookup::Found(ProductStock {
            product_id,
            product_name: product_name.clone(),
            batches,
        })
    }

    fn apply(&mut self, request: &DeductionRequest, mode: DeductionMode) -> Result<DeductionOutcome, DeductionError> {
        let mut outcome = DeductionOutcome::default();
        let mut touched: HashSet<BatchId> = HashSet::new();
        let mut staged: HashMap<BatchId, i64> = HashMap::new();

        for entry in &request.batch_updates {
            let batch_id = entry.batch_id;
            if !touched.contains(&batch_id) && self.was_applied(request.reservation_id, batch_id) {
                outcome.replayed += 1;
                continue;
            }

            let available = match staged.get(&batch_id) {
                Some(quantity) => *quantity,
                None => self
                    .batches
                    .get(&batch_id)
                    .map(|stored| stored.batch.quantity)
                    .ok_or(DeductionError::BatchNotFound(batch_id))?,
            };
            let remaining = deduct(batch_id, available, entry.quantity_to_deduct)?;

            match mode {
                DeductionMode::PerBatch => self.commit(batch_id, remaining, request.reservation_id),
                DeductionMode::AllOrNothing => {
                    staged.insert(batch_id, remaining);
                }
            }
            touched.insert(batch_id);
            outcome.applied += 1;
        }

        for (batch_id, remaining) in staged {
            self.commit(batch_id, remaining, request.reservation_id);
        }
        Ok(outcome)
    }

    fn was_applied(&self, reservation_id: Option<ReservationId>, batch_id: BatchId) -> bool {
        reservation_id.is_some_and(|rid| self.applied.contains(&(rid, batch_id)))
    }

    fn commit(&mut self, batch_id: BatchId, remaining: i64, reservation_id: Option<ReservationId>) {
        if let Some(stored) = self.batches.get_mut(&batch_id) {
            stored.batch.quantity = remaining;
        }
        if let Some(rid) = reservation_id {
            self.applied.insert((rid, batch_id));
        }
    }
}

/// In-memory inventory store.
///
/// Intended for tests/dev and single-process deployments. A single lock guards
/// all batches, so each write request is serialized against every other.
#[derive(Debug, Default)]
pub struct InMemoryInventoryStore {
    inner: RwLock<Inventory>,
    mode: DeductionMode,
}

impl InMemoryInventoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mode(mut self, mode: DeductionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Register a product (or rename an existing one). Reads report it as not
    /// found until it has at least one batch.
    pub fn add_product(&self, product_id: ProductId, product_name: impl Into<String>) -> Result<(), StoreError> {
        self.write()?.products.insert(product_id, product_name.into());
        Ok(())
    }

    /// Add a batch to a registered product. Batch ids are unique across products.
    pub fn add_batch(&self, product_id: ProductId, batch: Batch) -> Result<(), StoreError> {
        let mut inventory = self.write()?;
        if !inventory.products.contains_key(&product_id) {
            return Err(StoreError::storage(format!("unknown product: {product_id}")));
        }
        if batch.quantity < 0 {
            return Err(StoreError::storage(format!(
                "batch {} has negative quantity {}",
                batch.batch_id, batch.quantity
            )));
        }
        if inventory.batches.contains_key(&batch.batch_id) {
            return Err(StoreError::storage(format!("duplicate batch id: {}", batch.batch_id)));
        }
        inventory
            .batches
            .insert(batch.batch_id, StoredBatch { product_id, batch });
        Ok(())
    }

    /// Current state of a single batch.
    pub fn batch(&self, batch_id: BatchId) -> Result<Option<Batch>, StoreError> {
        Ok(self.read()?.batches.get(&batch_id).map(|stored| stored.batch.clone()))
    }

    /// Load every product and batch of a seed document.
    pub fn load_seed(&self, seed: &InventorySeed) -> Result<(), StoreError> {
        for product in &seed.products {
            self.add_product(product.product_id, product.product_name.clone())?;
            for batch in &product.batches {
                self.add_batch(product.product_id, batch.clone())?;
            }
        }
        Ok(())
    }

    /// Build a store from a seed document.
    pub fn from_seed(seed: &InventorySeed) -> Result<Self, StoreError> {
        let store = Self::new();
        store.load_seed(seed)?;
        Ok(store)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Inventory>, StoreError> {
        self.inner
            .read()
            .map_err(|_| StoreError::storage("lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Inventory>, StoreError> {
        self.inner
            .write()
            .map_err(|_| StoreError::storage("lock poisoned"))
    }
}

#[async_trait::async_trait]
impl InventoryStore for InMemoryInventoryStore {
    async fn stock_by_expiry(&self, product_id: ProductId) -> Result<StockLookup, StoreError> {
        Ok(self.read()?.stock(product_id))
    }

    async fn apply_deductions(&self, request: &DeductionRequest) -> Result<DeductionOutcome, StoreError> {
        if request.is_empty() {
            return Ok(DeductionOutcome::default());
        }

        let mut inventory = self.write()?;
        let outcome = inventory.apply(request, self.mode)?;
        debug!(
            product_id = %request.product_id,
            applied = outcome.applied,
            replayed = outcome.replayed,
            mode = %self.mode,
            "deductions applied"
        );
        Ok(outcome)
    }
}
