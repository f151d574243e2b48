//! Inventory domain module.
//!
//! Batches, the allocation policies that decide which batches an order draws
//! from, and the non-negative deduction rule. Pure, deterministic logic only
//! (no IO, no HTTP, no storage).

pub mod allocation;
pub mod batch;
pub mod deduction;

pub use allocation::{allocate, AllocationPlan, AllocationPolicy, Shortfall};
pub use batch::{Batch, ProductStock, StockLookup};
pub use deduction::{deduct, BatchDeduction, DeductionError, DeductionMode, DeductionRequest};
