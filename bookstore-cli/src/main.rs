//! bookstore CLI - runs and maintains the bookstore JSON API
//!
//! - `serve`: HTTP API (login/logout, users, books, authors, genres)
//! - `migrate`: apply the database schema
//! - `user create`: bootstrap an account
//! - `tokens purge`: drop expired session tokens
//! - `config show|path`: inspect configuration

use std::path::PathBuf;

use anyhow::{Context, Result};
use bookstore_core::BookstoreConfig;
use clap::{Parser, Subcommand};

mod commands;
mod tracing_setup;

#[derive(Parser, Debug)]
#[command(
    name = "bookstore",
    author,
    version,
    about = "REST API for a bookstore: session tokens, users, books, authors, genres"
)]
struct Cli {
    /// Config file (default: ~/.bookstore/config.toml)
    #[arg(long, global = true, env = "BOOKSTORE_CONFIG", value_name = "PATH")]
    config: Option<PathBuf>,

    /// Enable debug logging (RUST_LOG still wins)
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP API server
    Serve(commands::serve::ServeArgs),
    /// Apply the database schema
    Migrate,
    /// Manage users
    User(commands::user::UserArgs),
    /// Manage session tokens
    Tokens(commands::tokens::TokensArgs),
    /// Inspect configuration
    Config(commands::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env is optional
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let cfg = BookstoreConfig::load(cli.config.as_deref()).context("Failed to load config")?;

    tracing_setup::init(&tracing_setup::TracingConfig {
        debug: cli.debug,
        default_level: cfg.logging.level.clone(),
    })
    .ok();

    match cli.command {
        Commands::Serve(args) => commands::run_serve(args, cfg).await?,
        Commands::Migrate => commands::run_migrate(cfg).await?,
        Commands::User(args) => commands::run_user(args, cfg).await?,
        Commands::Tokens(args) => commands::run_tokens(args, cfg).await?,
        Commands::Config(args) => commands::run_config(args, &cfg)?,
    }
    Ok(())
}
