//! Placement error taxonomy.
//!
//! Every variant is terminal for the attempt that produced it. Nothing here is
//! retried or compensated.

use thiserror::Error;

use stockline_core::{BatchId, DomainError, ProductId};
use stockline_inventory::{DeductionError, Shortfall};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlacementError {
    /// Malformed or out-of-range input. The caller must fix the request.
    #[error("{0}")]
    InvalidRequest(String),

    /// The inventory read found no such product.
    #[error("No inventory found for productId: {0}")]
    ProductNotFound(ProductId),

    /// Total stock across batches is below the requested quantity.
    #[error("Insufficient inventory for productId: {product_id}. Requested: {requested}, Available: {available}")]
    InsufficientInventory {
        product_id: ProductId,
        requested: i64,
        available: i64,
    },

    /// A planned batch disappeared before the deduction was applied.
    #[error("Batch not found: {0}")]
    BatchNotFound(BatchId),

    /// A planned batch no longer holds enough stock (stale plan or a race).
    #[error("Insufficient quantity in batch: {batch_id}. Requested: {requested}, Available: {available}")]
    InsufficientBatchQuantity {
        batch_id: BatchId,
        requested: i64,
        available: i64,
    },

    /// The inventory service could not be reached or answered unexpectedly.
    #[error("Inventory service error: {0}")]
    Upstream(String),

    /// Recording the order failed after inventory was deducted.
    #[error("order store error: {0}")]
    Store(String),
}

impl PlacementError {
    /// Stable machine-readable code for the error kind.
    pub fn code(&self) -> &'static str {
        match self {
            PlacementError::InvalidRequest(_) => "invalid_request",
            PlacementError::ProductNotFound(_) => "product_not_found",
            PlacementError::InsufficientInventory { .. } => "insufficient_inventory",
            PlacementError::BatchNotFound(_) => "batch_not_found",
            PlacementError::InsufficientBatchQuantity { .. } => "insufficient_batch_quantity",
            PlacementError::Upstream(_) => "upstream_error",
            PlacementError::Store(_) => "store_error",
        }
    }
}

impl From<Shortfall> for PlacementError {
    fn from(value: Shortfall) -> Self {
        PlacementError::InsufficientInventory {
            product_id: value.product_id,
            requested: value.requested,
            available: value.available,
        }
    }
}

impl From<DeductionError> for PlacementError {
    fn from(value: DeductionError) -> Self {
        match value {
            DeductionError::BatchNotFound(batch_id) => PlacementError::BatchNotFound(batch_id),
            DeductionError::InsufficientBatchQuantity {
                batch_id,
                requested,
                available,
            } => PlacementError::InsufficientBatchQuantity {
                batch_id,
                requested,
                available,
            },
        }
    }
}

impl From<DomainError> for PlacementError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => PlacementError::InvalidRequest(msg),
            DomainError::InvariantViolation(msg) => PlacementError::InvalidRequest(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shortfall_maps_to_insufficient_inventory() {
        let err = PlacementError::from(Shortfall {
            product_id: ProductId::new(1005),
            requested: 200,
            available: 131,
        });
        assert_eq!(err.code(), "insufficient_inventory");
        assert_eq!(
            err.to_string(),
            "Insufficient inventory for productId: 1005. Requested: 200, Available: 131"
        );
    }

    #[test]
    fn deduction_errors_keep_batch_details() {
        let err = PlacementError::from(DeductionError::InsufficientBatchQuantity {
            batch_id: BatchId::new(7),
            requested: 11,
            available: 4,
        });
        assert_eq!(
            err,
            PlacementError::InsufficientBatchQuantity {
                batch_id: BatchId::new(7),
                requested: 11,
                available: 4,
            }
        );
        assert_eq!(
            PlacementError::from(DeductionError::BatchNotFound(BatchId::new(2))).code(),
            "batch_not_found"
        );
    }

    #[test]
    fn validation_maps_to_invalid_request() {
        let err = PlacementError::from(DomainError::validation("Order quantity must be greater than zero."));
        assert_eq!(err.code(), "invalid_request");
        assert_eq!(err.to_string(), "Order quantity must be greater than zero.");
    }
}
