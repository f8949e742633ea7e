use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

/// Creates the PostgreSQL pool used by the submission log.
///
/// Connections are opened on first use, so a database outage degrades
/// recording instead of preventing startup.
pub fn create_pool(database_url: &str) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(5))
        .connect_lazy(database_url)
        .context("DATABASE_URL is not a valid PostgreSQL connection string")?;

    info!("PostgreSQL connection pool configured");
    Ok(pool)
}

/// Applies pending schema migrations. Only run by `docgen migrate`.
pub async fn run_migrations(database_url: &str) -> Result<()> {
    info!("Connecting to PostgreSQL...");
    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(database_url)
        .await
        .context("Failed to connect to PostgreSQL")?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to apply migrations")?;

    info!("Database migrations applied");
    pool.close().await;
    Ok(())
}
