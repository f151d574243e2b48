use std::sync::Arc;

use tracing::info;

use stockline_infra::config::AppConfig;
use stockline_infra::db;
use stockline_infra::inventory_gateway::{HttpInventoryGateway, InventoryGateway, LocalInventoryGateway};
use stockline_infra::inventory_store::{InMemoryInventoryStore, InventoryStore, PostgresInventoryStore};
use stockline_infra::order_placement::OrderPlacement;
use stockline_infra::order_store::{InMemoryOrderRepository, OrderRepository, PostgresOrderRepository};
use stockline_infra::seed::InventorySeed;
use stockline_inventory::{AllocationPolicy, DeductionMode};

pub type Placement = OrderPlacement<Arc<dyn InventoryGateway>, Arc<dyn OrderRepository>>;

/// Everything the handlers need.
///
/// `inventory` backs the `/inventory` endpoints. The order path goes through
/// the placement pipeline's gateway, which is either the same store or a
/// remote inventory service.
pub struct AppServices {
    inventory: Arc<dyn InventoryStore>,
    placement: Placement,
}

impl AppServices {
    pub fn new(
        inventory: Arc<dyn InventoryStore>,
        gateway: Arc<dyn InventoryGateway>,
        orders: Arc<dyn OrderRepository>,
        default_policy: AllocationPolicy,
    ) -> Self {
        Self {
            inventory,
            placement: OrderPlacement::new(gateway, orders).with_default_policy(default_policy),
        }
    }

    /// Single-process wiring over in-memory stores (dev/test).
    pub fn in_memory(store: InMemoryInventoryStore, default_policy: AllocationPolicy) -> Self {
        let inventory: Arc<dyn InventoryStore> = Arc::new(store);
        let gateway: Arc<dyn InventoryGateway> = Arc::new(LocalInventoryGateway::new(inventory.clone()));
        Self::new(inventory, gateway, Arc::new(InMemoryOrderRepository::new()), default_policy)
    }

    pub fn inventory(&self) -> &dyn InventoryStore {
        self.inventory.as_ref()
    }

    pub fn placement(&self) -> &Placement {
        &self.placement
    }
}

pub async fn build_services(config: &AppConfig) -> anyhow::Result<AppServices> {
    let seed = config
        .inventory_seed_path
        .as_deref()
        .map(InventorySeed::from_path)
        .transpose()?;

    let (inventory, orders): (Arc<dyn InventoryStore>, Arc<dyn OrderRepository>) = if config.use_persistent_stores {
        build_persistent_stores(config, seed.as_ref()).await?
    } else {
        build_in_memory_stores(config.deduction_mode, seed.as_ref())?
    };

    let gateway: Arc<dyn InventoryGateway> = match &config.inventory_service_url {
        Some(url) => {
            info!(url = %url, "order path uses remote inventory service");
            Arc::new(HttpInventoryGateway::new(url.clone(), config.upstream_timeout)?)
        }
        None => Arc::new(LocalInventoryGateway::new(inventory.clone())),
    };

    Ok(AppServices::new(inventory, gateway, orders, config.allocation_policy))
}

fn build_in_memory_stores(
    mode: DeductionMode,
    seed: Option<&InventorySeed>,
) -> anyhow::Result<(Arc<dyn InventoryStore>, Arc<dyn OrderRepository>)> {
    let store = InMemoryInventoryStore::new().with_mode(mode);
    if let Some(seed) = seed {
        store.load_seed(seed)?;
        info!(products = seed.products.len(), batches = seed.batch_count(), "inventory seed loaded");
    }
    Ok((Arc::new(store), Arc::new(InMemoryOrderRepository::new())))
}

async fn build_persistent_stores(
    config: &AppConfig,
    seed: Option<&InventorySeed>,
) -> anyhow::Result<(Arc<dyn InventoryStore>, Arc<dyn OrderRepository>)> {
    let pool = db::connect(config.require_database_url()?).await?;

    let store = PostgresInventoryStore::new(pool.clone()).with_mode(config.deduction_mode);
    if let Some(seed) = seed {
        store.load_seed(seed).await?;
        info!(products = seed.products.len(), "inventory seed written to Postgres");
    }

    Ok((Arc::new(store), Arc::new(PostgresOrderRepository::new(pool))))
}
