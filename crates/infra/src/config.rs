//! Process configuration read from environment variables.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context};
use tracing::warn;

use stockline_inventory::{AllocationPolicy, DeductionMode};

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_UPSTREAM_TIMEOUT_MS: u64 = 5000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub allocation_policy: AllocationPolicy,
    pub deduction_mode: DeductionMode,
    /// When set, the order path talks to this inventory service over HTTP.
    pub inventory_service_url: Option<String>,
    pub inventory_seed_path: Option<PathBuf>,
    pub use_persistent_stores: bool,
    pub database_url: Option<String>,
    pub upstream_timeout: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            allocation_policy: AllocationPolicy::default(),
            deduction_mode: DeductionMode::default(),
            inventory_service_url: None,
            inventory_seed_path: None,
            use_persistent_stores: false,
            database_url: None,
            upstream_timeout: Duration::from_millis(DEFAULT_UPSTREAM_TIMEOUT_MS),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut config = AppConfig::default();

        if let Some(addr) = var("BIND_ADDR") {
            match addr.parse::<SocketAddr>() {
                Ok(addr) => config.bind_addr = addr,
                Err(_) => warn!(value = %addr, "invalid BIND_ADDR, using {}", DEFAULT_BIND_ADDR),
            }
        }

        if let Some(policy) = var("ALLOCATION_POLICY") {
            config.allocation_policy = policy
                .parse::<AllocationPolicy>()
                .map_err(|e| anyhow!("ALLOCATION_POLICY: {e}"))?;
        }

        if let Some(mode) = var("DEDUCTION_MODE") {
            config.deduction_mode = mode.parse::<DeductionMode>().map_err(|e| anyhow!("DEDUCTION_MODE: {e}"))?;
        }

        config.inventory_service_url = var("INVENTORY_SERVICE_URL");
        config.inventory_seed_path = var("INVENTORY_SEED_PATH").map(PathBuf::from);

        if let Some(flag) = var("USE_PERSISTENT_STORES") {
            config.use_persistent_stores = flag.parse::<bool>().unwrap_or_else(|_| {
                warn!(value = %flag, "invalid USE_PERSISTENT_STORES, using false");
                false
            });
        }
        config.database_url = var("DATABASE_URL");

        if let Some(ms) = var("UPSTREAM_TIMEOUT_MS") {
            match ms.parse::<u64>() {
                Ok(ms) if ms > 0 => config.upstream_timeout = Duration::from_millis(ms),
                _ => warn!(value = %ms, "invalid UPSTREAM_TIMEOUT_MS, using {}", DEFAULT_UPSTREAM_TIMEOUT_MS),
            }
        }

        Ok(config)
    }

    /// Connection string for the Postgres stores.
    pub fn require_database_url(&self) -> anyhow::Result<&str> {
        self.database_url
            .as_deref()
            .context("DATABASE_URL must be set when USE_PERSISTENT_STORES=true")
    }
}
