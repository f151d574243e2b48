//! How the order path reaches inventory.
//!
//! The placement pipeline never touches a store directly. It reads stock and
//! submits deductions through an `InventoryGateway`, which is either the
//! in-process store or a remote inventory service spoken to over HTTP.

pub mod http;
pub mod local;
pub mod wire;

pub use http::HttpInventoryGateway;
pub use local::LocalInventoryGateway;
pub use wire::ErrorBody;

use std::sync::Arc;

use thiserror::Error;

use stockline_core::ProductId;
use stockline_inventory::{DeductionError, DeductionRequest, StockLookup};
use stockline_orders::PlacementError;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// The inventory side refused a deduction entry.
    #[error(transparent)]
    Deduction(#[from] DeductionError),

    /// The inventory side failed or could not be reached.
    #[error("{0}")]
    Upstream(String),
}

impl From<GatewayError> for PlacementError {
    fn from(value: GatewayError) -> Self {
        match value {
            GatewayError::Deduction(err) => err.into(),
            GatewayError::Upstream(msg) => PlacementError::Upstream(msg),
        }
    }
}

#[async_trait::async_trait]
pub trait InventoryGateway: Send + Sync {
    async fn fetch_stock(&self, product_id: ProductId) -> Result<StockLookup, GatewayError>;

    async fn apply_deductions(&self, request: &DeductionRequest) -> Result<(), GatewayError>;
}

#[async_trait::async_trait]
impl<G> InventoryGateway for Arc<G>
where
    G: InventoryGateway + ?Sized,
{
    async fn fetch_stock(&self, product_id: ProductId) -> Result<StockLookup, GatewayError> {
        (**self).fetch_stock(product_id).await
    }

    async fn apply_deductions(&self, request: &DeductionRequest) -> Result<(), GatewayError> {
        (**self).apply_deductions(request).await
    }
}
