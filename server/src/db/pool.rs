//! Connection pool and schema setup.

use crate::config::Config;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;

pub type Pool = PgPool;

/// Connect to PostgreSQL using the configured URL and pool size.
pub async fn connect(config: &Config) -> Result<Pool, sqlx::Error> {
    tracing::debug!(max_connections = config.max_connections, "Connecting to database");
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(10))
        .connect(&config.database_url)
        .await
}

/// Apply pending migrations from `./migrations`.
pub async fn migrate(pool: &Pool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
