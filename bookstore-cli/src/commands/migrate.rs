//! Apply the database schema

use anyhow::{Context, Result};
use bookstore_core::BookstoreConfig;
use bookstore_server::db::migrations;

use super::open_store;

pub async fn run_migrate(cfg: BookstoreConfig) -> Result<()> {
    let store = open_store(&cfg.database).await?;
    migrations::run(store.pool())
        .await
        .context("Failed to run migrations")?;

    println!("Schema is up to date");
    Ok(())
}
