//! Session token maintenance

use anyhow::{Context, Result};
use bookstore_core::BookstoreConfig;
use bookstore_server::auth::AuthService;
use clap::{Parser, Subcommand};

use super::open_store;

#[derive(Parser, Debug)]
pub struct TokensArgs {
    #[command(subcommand)]
    pub command: TokensCommands,
}

#[derive(Subcommand, Debug)]
pub enum TokensCommands {
    /// Delete expired session tokens
    Purge,
}

pub async fn run_tokens(args: TokensArgs, cfg: BookstoreConfig) -> Result<()> {
    match args.command {
        TokensCommands::Purge => {
            let store = open_store(&cfg.database).await?;
            let purged = AuthService::new(&store, cfg.auth.bcrypt_cost)
                .purge_expired()
                .await
                .context("Failed to purge expired tokens")?;
            println!("Purged {} expired token(s)", purged);
        }
    }
    Ok(())
}
