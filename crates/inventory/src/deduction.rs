//! Batch deductions: the write side of a reservation.
//!
//! A deduction request is the allocation plan as sent to the inventory store.
//! The only rule enforced here is that a batch's quantity never goes below zero.

use core::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use stockline_core::{BatchId, DomainError, ProductId, ReservationId};

/// One entry of a deduction request.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchDeduction {
    pub batch_id: BatchId,
    pub quantity_to_deduct: i64,
}

impl BatchDeduction {
    pub fn new(batch_id: BatchId, quantity_to_deduct: i64) -> Self {
        Self {
            batch_id,
            quantity_to_deduct,
        }
    }
}

/// An ordered set of batch deductions for one product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeductionRequest {
    pub product_id: ProductId,
    pub batch_updates: Vec<BatchDeduction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reservation_id: Option<ReservationId>,
}

impl DeductionRequest {
    pub fn new(product_id: ProductId, batch_updates: Vec<BatchDeduction>) -> Self {
        Self {
            product_id,
            batch_updates,
            reservation_id: None,
        }
    }

    pub fn with_reservation(mut self, reservation_id: ReservationId) -> Self {
        self.reservation_id = Some(reservation_id);
        self
    }

    /// Reject entries that could never be a valid deduction.
    pub fn validate(&self) -> Result<(), DomainError> {
        for entry in &self.batch_updates {
            if entry.quantity_to_deduct <= 0 {
                return Err(DomainError::validation(format!(
                    "quantityToDeduct must be positive (batch {})",
                    entry.batch_id
                )));
            }
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.batch_updates.is_empty()
    }
}

/// Failure while applying a deduction to a stored batch.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeductionError {
    #[error("batch not found: {0}")]
    BatchNotFound(BatchId),

    #[error("insufficient quantity in batch {batch_id}: requested {requested}, available {available}")]
    InsufficientBatchQuantity {
        batch_id: BatchId,
        requested: i64,
        available: i64,
    },
}

impl DeductionError {
    pub fn batch_id(&self) -> BatchId {
        match self {
            DeductionError::BatchNotFound(id) => *id,
            DeductionError::InsufficientBatchQuantity { batch_id, .. } => *batch_id,
        }
    }
}

/// Quantity left in a batch after taking `amount` from `available`.
///
/// Fails (and the caller must leave the batch untouched) if the result would be
/// negative.
pub fn deduct(batch_id: BatchId, available: i64, amount: i64) -> Result<i64, DeductionError> {
    let remaining = available - amount;
    if remaining < 0 {
        return Err(DeductionError::InsufficientBatchQuantity {
            batch_id,
            requested: amount,
            available,
        });
    }
    Ok(remaining)
}

/// How a multi-batch deduction request is committed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeductionMode {
    /// Each entry is committed before the next one is checked. A failing entry
    /// leaves earlier entries deducted.
    #[default]
    PerBatch,
    /// Every entry is checked first; nothing is written unless all succeed.
    AllOrNothing,
}

impl DeductionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeductionMode::PerBatch => "per_batch",
            DeductionMode::AllOrNothing => "all_or_nothing",
        }
    }
}

impl core::fmt::Display for DeductionMode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeductionMode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "per_batch" => Ok(DeductionMode::PerBatch),
            "all_or_nothing" => Ok(DeductionMode::AllOrNothing),
            other => Err(DomainError::validation(format!(
                "unknown deduction mode: {other} (expected per_batch or all_or_nothing)"
            ))),
        }
    }
}
