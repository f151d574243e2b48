use serde::{Deserialize, Serialize};

use stockline_core::{DomainError, ProductId, ReservationId};
use stockline_infra::inventory_store::DeductionOutcome;
use stockline_inventory::{BatchDeduction, DeductionRequest};

// -------------------------
// Request DTOs
// -------------------------

/// Body of `POST /inventory/update`.
///
/// Fields are optional so that a missing field becomes a 400 with a clear
/// message instead of a decoding error.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateInventoryRequest {
    pub product_id: Option<ProductId>,
    pub batch_updates: Option<Vec<BatchDeduction>>,
    #[serde(default)]
    pub reservation_id: Option<ReservationId>,
}

impl UpdateInventoryRequest {
    pub fn into_deduction_request(self) -> Result<DeductionRequest, DomainError> {
        let product_id = self
            .product_id
            .ok_or_else(|| DomainError::validation("productId is required."))?;
        let batch_updates = self
            .batch_updates
            .ok_or_else(|| DomainError::validation("batchUpdates is required."))?;

        let request = DeductionRequest {
            product_id,
            batch_updates,
            reservation_id: self.reservation_id,
        };
        request.validate()?;
        Ok(request)
    }
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateInventoryResponse {
    pub product_id: ProductId,
    pub applied: usize,
    pub replayed: usize,
}

impl UpdateInventoryResponse {
    pub fn new(product_id: ProductId, outcome: DeductionOutcome) -> Self {
        Self {
            product_id,
            applied: outcome.applied,
            replayed: outcome.replayed,
        }
    }
}
