//! Command implementations for the bookstore CLI

pub mod config;
pub mod migrate;
pub mod serve;
pub mod tokens;
pub mod user;

pub use config::run_config;
pub use migrate::run_migrate;
pub use serve::run_serve;
pub use tokens::run_tokens;
pub use user::run_user;

use anyhow::{Context, Result};
use bookstore_core::DatabaseConfig;
use bookstore_server::db::{connect_options, connect_with, PoolSettings, Store};

/// Connect, probe, and wrap the pool with the configured per-call deadline.
pub(crate) async fn open_store(cfg: &DatabaseConfig) -> Result<Store> {
    let options = connect_options(cfg).context("Invalid database configuration")?;
    let pool = connect_with(options, PoolSettings::from(cfg))
        .await
        .context("Failed to connect to database")?;
    Ok(Store::new(pool, cfg.query_timeout()))
}
