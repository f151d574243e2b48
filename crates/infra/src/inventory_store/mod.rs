//! Inventory batch storage.
//!
//! The store owns batch quantities. Reads return a product's batches ordered by
//! expiry; writes apply a deduction request under the store's `DeductionMode`.

pub mod in_memory;
pub mod postgres;

pub use in_memory::InMemoryInventoryStore;
pub use postgres::PostgresInventoryStore;

use std::sync::Arc;

use serde::Serialize;

use stockline_core::ProductId;
use stockline_inventory::{DeductionRequest, StockLookup};

use crate::StoreError;

/// Counts reported back from a deduction write.
///
/// `replayed` entries were skipped because the same reservation had already
/// been applied to that batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeductionOutcome {
    pub applied: usize,
    pub replayed: usize,
}

#[async_trait::async_trait]
pub trait InventoryStore: Send + Sync {
    /// Load a product and its batches, ordered by expiry date ascending.
    ///
    /// A product with no batch at all is `NotFound`, the same as an unknown id.
    /// Batches drained to zero still count.
    async fn stock_by_expiry(&self, product_id: ProductId) -> Result<StockLookup, StoreError>;

    /// Apply every entry of `request`.
    ///
    /// Entries are processed in request order. An empty request is a no-op.
    async fn apply_deductions(&self, request: &DeductionRequest) -> Result<DeductionOutcome, StoreError>;
}

#[async_trait::async_trait]
impl<S> InventoryStore for Arc<S>
where
    S: InventoryStore + ?Sized,
{
    async fn stock_by_expiry(&self, product_id: ProductId) -> Result<StockLookup, StoreError> {
        (**self).stock_by_expiry(product_id).await
    }

    async fn apply_deductions(&self, request: &DeductionRequest) -> Result<DeductionOutcome, StoreError> {
        (**self).apply_deductions(request).await
    }
}
