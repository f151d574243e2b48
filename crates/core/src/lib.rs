//! `stockline-core`: shared domain building blocks.
//!
//! Identifiers and the domain error model used by every other crate. Nothing in
//! here performs IO.

pub mod error;
pub mod id;

pub use error::DomainError;
pub use id::{BatchId, OrderId, ProductId, ReservationId};
