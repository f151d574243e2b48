use stockline_core::ProductId;
use stockline_inventory::{DeductionRequest, StockLookup};

use super::{GatewayError, InventoryGateway};
use crate::inventory_store::InventoryStore;
use crate::StoreError;

/// Gateway over an in-process inventory store.
#[derive(Debug, Clone)]
pub struct LocalInventoryGateway<S> {
    store: S,
}

impl<S> LocalInventoryGateway<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

impl From<StoreError> for GatewayError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Deduction(err) => GatewayError::Deduction(err),
            StoreError::Storage(msg) => GatewayError::Upstream(format!("inventory store failure: {msg}")),
        }
    }
}

#[async_trait::async_trait]
impl<S> InventoryGateway for LocalInventoryGateway<S>
where
    S: InventoryStore,
{
    async fn fetch_stock(&self, product_id: ProductId) -> Result<StockLookup, GatewayError> {
        Ok(self.store.stock_by_expiry(product_id).await?)
    }

    async fn apply_deductions(&self, request: &DeductionRequest) -> Result<(), GatewayError> {
        self.store.apply_deductions(request).await?;
        Ok(())
    }
}
