use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use stockline_core::{BatchId, ProductId};

/// A quantity of one product sharing a single expiry date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Batch {
    pub batch_id: BatchId,
    pub quantity: i64,
    pub expiry_date: NaiveDate,
}

impl Batch {
    pub fn new(batch_id: BatchId, quantity: i64, expiry_date: NaiveDate) -> Self {
        Self {
            batch_id,
            quantity,
            expiry_date,
        }
    }

    /// Batches with nothing on hand are skipped by every allocation policy.
    pub fn is_drawable(&self) -> bool {
        self.quantity > 0
    }
}

/// Snapshot of a product's stock as returned by the inventory read path.
///
/// `batches` is ordered by expiry date ascending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductStock {
    pub product_id: ProductId,
    pub product_name: String,
    pub batches: Vec<Batch>,
}

impl ProductStock {
    pub fn new(product_id: ProductId, product_name: impl Into<String>, mut batches: Vec<Batch>) -> Self {
        sort_by_expiry(&mut batches);
        Self {
            product_id,
            product_name: product_name.into(),
            batches,
        }
    }

    /// Sum of the drawable quantity across all batches.
    pub fn total_available(&self) -> i64 {
        self.batches
            .iter()
            .filter(|b| b.is_drawable())
            .map(|b| b.quantity)
            .sum()
    }
}

/// Outcome of reading a product's batches.
///
/// A product with no batches is `NotFound`, whether or not its id is known.
/// `Found` always carries at least one batch, possibly drained to zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StockLookup {
    Found(ProductStock),
    NotFound,
}

impl StockLookup {
    pub fn found(self) -> Option<ProductStock> {
        match self {
            StockLookup::Found(stock) => Some(stock),
            StockLookup::NotFound => None,
        }
    }
}

/// Stable sort by expiry date; batches sharing a date keep their relative order.
pub fn sort_by_expiry(batches: &mut [Batch]) {
    batches.sort_by_key(|b| b.expiry_date);
}
