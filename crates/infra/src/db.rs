//! Postgres connection and schema bootstrap.

use anyhow::Context;
use sqlx::PgPool;

const SCHEMA: &[(&str, &str)] = &[
    (
        "products",
        r#"
        CREATE TABLE IF NOT EXISTS products (
            product_id   BIGINT PRIMARY KEY,
            product_name TEXT NOT NULL
        )
        "#,
    ),
    (
        "inventory_batches",
        r#"
        CREATE TABLE IF NOT EXISTS inventory_batches (
            batch_id    BIGINT PRIMARY KEY,
            product_id  BIGINT NOT NULL REFERENCES products (product_id),
            quantity    BIGINT NOT NULL CHECK (quantity >= 0),
            expiry_date DATE NOT NULL
        )
        "#,
    ),
    (
        "inventory_batches_product_expiry_idx",
        r#"
        CREATE INDEX IF NOT EXISTS inventory_batches_product_expiry_idx
            ON inventory_batches (product_id, expiry_date, batch_id)
        "#,
    ),
    (
        "applied_reservations",
        r#"
        CREATE TABLE IF NOT EXISTS applied_reservations (
            reservation_id UUID NOT NULL,
            batch_id       BIGINT NOT NULL,
            quantity       BIGINT NOT NULL,
            applied_at     TIMESTAMPTZ NOT NULL DEFAULT now(),
            PRIMARY KEY (reservation_id, batch_id)
        )
        "#,
    ),
    (
        "orders",
        r#"
        CREATE TABLE IF NOT EXISTS orders (
            order_id           BIGSERIAL PRIMARY KEY,
            product_id         BIGINT NOT NULL,
            product_name       TEXT NOT NULL,
            quantity           BIGINT NOT NULL CHECK (quantity > 0),
            status             TEXT NOT NULL,
            order_date         DATE NOT NULL,
            reserved_batch_ids BIGINT[] NOT NULL
        )
        "#,
    ),
];

/// Connect to Postgres and make sure every table exists.
pub async fn connect(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPool::connect(database_url)
        .await
        .context("failed to connect to Postgres")?;
    ensure_schema(&pool).await?;
    Ok(pool)
}

pub async fn ensure_schema(pool: &PgPool) -> anyhow::Result<()> {
    for (name, ddl) in SCHEMA {
        sqlx::query(ddl)
            .execute(pool)
            .await
            .with_context(|| format!("failed to create {name}"))?;
    }
    Ok(())
}
