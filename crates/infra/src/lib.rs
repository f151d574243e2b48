//! Infrastructure layer: storage, the inventory gateway, configuration, and the
//! order placement pipeline that composes them.

pub mod config;
pub mod db;
pub mod error;
pub mod inventory_gateway;
pub mod inventory_store;
pub mod order_placement;
pub mod order_store;
pub mod seed;

pub use error::StoreError;
