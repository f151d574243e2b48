//! Allocation: deciding which batches an order draws from.
//!
//! The allocator is pure. It turns a batch snapshot and a requested quantity
//! into an ordered plan of per-batch deductions, or reports a shortfall. It
//! never mutates stock; the plan is applied by the inventory store.

use core::cmp::Reverse;
use core::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use stockline_core::{BatchId, DomainError, ProductId, ReservationId};

use crate::batch::Batch;
use crate::deduction::{BatchDeduction, DeductionRequest};

/// Order in which batches are drawn.
///
/// Exactly one policy applies to an allocation. `Fefo` is the default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AllocationPolicy {
    /// First-expiry-first-out: soonest expiry first. Uses the supplied
    /// (expiry-ascending) order as-is.
    #[default]
    Fefo,
    /// First-in-first-out: oldest batch (lowest batch id) first.
    Fifo,
    /// Last-in-first-out: newest batch (highest batch id) first.
    Lifo,
}

impl AllocationPolicy {
    pub const ALL: [AllocationPolicy; 3] = [
        AllocationPolicy::Fefo,
        AllocationPolicy::Fifo,
        AllocationPolicy::Lifo,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AllocationPolicy::Fefo => "fefo",
            AllocationPolicy::Fifo => "fifo",
            AllocationPolicy::Lifo => "lifo",
        }
    }

    /// Batches in the order this policy draws from them.
    ///
    /// Sorting is stable, so batches that compare equal keep the supplied order.
    pub fn draw_order<'a>(&self, batches: &'a [Batch]) -> Vec<&'a Batch> {
        let mut ordered: Vec<&Batch> = batches.iter().collect();
        match self {
            AllocationPolicy::Fefo => {}
            AllocationPolicy::Fifo => ordered.sort_by_key(|b| b.batch_id),
            AllocationPolicy::Lifo => ordered.sort_by_key(|b| Reverse(b.batch_id)),
        }
        ordered
    }
}

impl core::fmt::Display for AllocationPolicy {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AllocationPolicy {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fefo" => Ok(AllocationPolicy::Fefo),
            "fifo" => Ok(AllocationPolicy::Fifo),
            "lifo" => Ok(AllocationPolicy::Lifo),
            other => Err(DomainError::validation(format!(
                "unknown allocation policy: {other} (expected one of: fefo, fifo, lifo)"
            ))),
        }
    }
}

/// Ordered per-batch deductions that together cover a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationPlan {
    product_id: ProductId,
    requested: i64,
    lines: Vec<BatchDeduction>,
}

impl AllocationPlan {
    pub fn product_id(&self) -> ProductId {
        self.product_id
    }

    pub fn requested(&self) -> i64 {
        self.requested
    }

    pub fn lines(&self) -> &[BatchDeduction] {
        &self.lines
    }

    /// Batch ids in draw order.
    pub fn batch_ids(&self) -> Vec<BatchId> {
        self.lines.iter().map(|l| l.batch_id).collect()
    }

    pub fn total(&self) -> i64 {
        self.lines.iter().map(|l| l.quantity_to_deduct).sum()
    }

    /// The inventory write that applies this plan.
    pub fn to_deduction_request(&self, reservation_id: ReservationId) -> DeductionRequest {
        DeductionRequest::new(self.product_id, self.lines.clone()).with_reservation(reservation_id)
    }
}

/// Total drawable stock is below the requested quantity.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("insufficient inventory for product {product_id}: requested {requested}, available {available}")]
pub struct Shortfall {
    pub product_id: ProductId,
    pub requested: i64,
    pub available: i64,
}

/// Allocate `requested` units of `product_id` from `batches`.
///
/// `batches` must be ordered by expiry date ascending (the inventory read
/// order). The caller guarantees `requested > 0`.
pub fn allocate(
    product_id: ProductId,
    batches: &[Batch],
    requested: i64,
    policy: AllocationPolicy,
) -> Result<AllocationPlan, Shortfall> {
    let mut remaining = requested;
    let mut lines = Vec::new();

    for batch in policy.draw_order(batches) {
        if remaining <= 0 {
            break;
        }
        if !batch.is_drawable() {
            continue;
        }

        let amount = batch.quantity.min(remaining);
        lines.push(BatchDeduction::new(batch.batch_id, amount));
        remaining -= amount;
    }

    if remaining > 0 {
        return Err(Shortfall {
            product_id,
            requested,
            available: requested - remaining,
        });
    }

    Ok(AllocationPlan {
        product_id,
        requested,
        lines,
    })
}
