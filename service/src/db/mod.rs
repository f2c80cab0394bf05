// cart_service/src/db/mod.rs

pub mod pg_store;

pub use pg_store::PgStore;

use crate::config::AppConfig;
use crate::errors::Result;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

/// Connects the pool and applies pending migrations when enabled.
pub async fn connect(config: &AppConfig) -> Result<PgPool> {
  let pool = PgPoolOptions::new()
    .max_connections(config.db_max_connections)
    .connect(&config.database_url)
    .await?;
  tracing::info!(max_connections = config.db_max_connections, "Successfully connected to the database.");

  if config.run_migrations {
    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Database migrations applied.");
  }
  Ok(pool)
}
