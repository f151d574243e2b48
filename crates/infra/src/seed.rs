//! Inventory seed documents.
//!
//! ```json
//! {"products": [{"productId": 1001, "productName": "Laptop",
//!                "batches": [{"batchId": 1, "quantity": 68, "expiryDate": "2026-06-25"}]}]}
//! ```

use std::collections::HashSet;
use std::path::Path;

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};

use stockline_core::ProductId;
use stockline_inventory::Batch;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedProduct {
    pub product_id: ProductId,
    pub product_name: String,
    #[serde(default)]
    pub batches: Vec<Batch>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventorySeed {
    pub products: Vec<SeedProduct>,
}

impl InventorySeed {
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let seed: InventorySeed = serde_json::from_str(json).context("invalid inventory seed document")?;
        seed.validate()?;
        Ok(seed)
    }

    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read inventory seed at {:?}", path))?;
        Self::from_json(&json).with_context(|| format!("failed to load inventory seed at {:?}", path))
    }

    /// Reject duplicate ids and negative quantities.
    pub fn validate(&self) -> anyhow::Result<()> {
        let mut products = HashSet::new();
        let mut batches = HashSet::new();

        for product in &self.products {
            if !products.insert(product.product_id) {
                bail!("duplicate productId {} in seed", product.product_id);
            }
            for batch in &product.batches {
                if !batches.insert(batch.batch_id) {
                    bail!("duplicate batchId {} in seed", batch.batch_id);
                }
                if batch.quantity < 0 {
                    bail!("batch {} has negative quantity {}", batch.batch_id, batch.quantity);
                }
            }
        }
        Ok(())
    }

    pub fn batch_count(&self) -> usize {
        self.products.iter().map(|p| p.batches.len()).sum()
    }
}
