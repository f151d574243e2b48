use anyhow::Context;

use stockline_infra::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    stockline_observability::init();

    let config = AppConfig::from_env()?;
    let app = stockline_api::app::build_app(&config).await?;

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!(
        policy = %config.allocation_policy,
        mode = %config.deduction_mode,
        remote_inventory = config.inventory_service_url.is_some(),
        persistent = config.use_persistent_stores,
        "listening on {}",
        listener.local_addr()?
    );

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
