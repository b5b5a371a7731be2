//! Postgres pool bootstrap and schema migrations.

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use crate::config::DatabaseConfig;
use crate::store::StoreError;

/// Open a pool honouring the configured size and acquire timeout.
pub async fn connect(config: &DatabaseConfig) -> Result<PgPool, StoreError> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout)
        .connect(&config.url)
        .await
        .map_err(|e| StoreError::Unavailable(format!("failed to connect to postgres: {e}")))?;
    tracing::info!(
        max_connections = config.max_connections,
        "postgres pool ready"
    );
    Ok(pool)
}

/// Apply the embedded migrations (`account`, `transaction`).
pub async fn migrate(pool: &PgPool) -> Result<(), StoreError> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| StoreError::Database(format!("migration failed: {e}")))?;
    tracing::info!("database migrations applied");
    Ok(())
}
