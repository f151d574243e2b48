//! Orders domain module.
//!
//! Order placement requests, the placed-order record and its confirmation, and
//! the placement error taxonomy. Deterministic domain logic only (no IO, no
//! HTTP, no storage).

pub mod error;
pub mod order;

pub use error::PlacementError;
pub use order::{
    NewOrder, Order, OrderConfirmation, OrderStatus, PlaceOrder, ValidatedOrder, CONFIRMATION_MESSAGE,
};
