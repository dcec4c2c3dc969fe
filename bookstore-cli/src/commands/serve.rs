//! HTTP server command
//!
//! Connects to the store, applies the schema, and serves the JSON API
//! until Ctrl+C or SIGTERM.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use bookstore_core::BookstoreConfig;
use clap::Parser;

use bookstore_server::db::migrations;
use bookstore_server::http::{run_server, AppState, AuthSettings, ServerConfig};

use super::open_store;

/// Arguments for the serve command
#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Address to bind to (overrides server.bind)
    #[arg(long, short = 'b')]
    pub bind: Option<SocketAddr>,

    /// Allow permissive CORS (all origins) - use with caution
    #[arg(long)]
    pub cors_permissive: bool,

    /// Database URL (overrides config)
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    pub database_url: Option<String>,

    /// Do not apply the schema at start-up
    #[arg(long)]
    pub skip_migrations: bool,
}

/// Run the HTTP server
pub async fn run_serve(args: ServeArgs, mut cfg: BookstoreConfig) -> Result<()> {
    if let Some(url) = args.database_url {
        cfg.database.url = Some(url);
    }

    let mut server = ServerConfig::try_from(&cfg.server).context("Invalid [server] config")?;
    if let Some(bind) = args.bind {
        server.bind_addr = bind;
    }
    server.cors_permissive |= args.cors_permissive;

    tracing::info!("Starting bookstore server on {}", server.bind_addr);

    let store = open_store(&cfg.database).await?;

    if args.skip_migrations {
        tracing::info!("skipping migrations");
    } else {
        migrations::run(store.pool())
            .await
            .context("Failed to run migrations")?;
    }

    let state = AppState::new(store, AuthSettings::from(&cfg.auth));

    // Blocks until shutdown
    run_server(state, server).await.context("Server error")?;

    Ok(())
}
