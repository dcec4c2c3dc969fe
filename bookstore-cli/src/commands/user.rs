//! User maintenance from the command line
//!
//! `user create` bootstraps the first admin account, since every user
//! route on the HTTP side already requires a bearer token.

use anyhow::{Context, Result};
use bookstore_core::BookstoreConfig;
use bookstore_server::auth::AuthService;
use clap::{Parser, Subcommand};

use super::open_store;

#[derive(Parser, Debug)]
pub struct UserArgs {
    #[command(subcommand)]
    pub command: UserCommands,
}

#[derive(Subcommand, Debug)]
pub enum UserCommands {
    /// Create a user with a hashed password
    Create(CreateUserArgs),
}

#[derive(Parser, Debug)]
pub struct CreateUserArgs {
    /// Email address (must be unique)
    #[arg(long)]
    pub email: String,

    /// Given name
    #[arg(long, default_value = "")]
    pub first_name: String,

    /// Family name
    #[arg(long, default_value = "")]
    pub last_name: String,

    /// Initial password
    #[arg(long, env = "BOOKSTORE_USER_PASSWORD", hide_env_values = true)]
    pub password: String,

    /// Create the account disabled
    #[arg(long)]
    pub inactive: bool,
}

pub async fn run_user(args: UserArgs, cfg: BookstoreConfig) -> Result<()> {
    match args.command {
        UserCommands::Create(args) => create_user(args, &cfg).await,
    }
}

async fn create_user(args: CreateUserArgs, cfg: &BookstoreConfig) -> Result<()> {
    let store = open_store(&cfg.database).await?;
    let auth = AuthService::new(&store, cfg.auth.bcrypt_cost);

    let id = auth
        .create_user(
            &args.email,
            &args.first_name,
            &args.last_name,
            &args.password,
            !args.inactive,
        )
        .await
        .with_context(|| format!("Failed to create user {}", args.email))?;

    println!("Created user {} (id {})", args.email, id);
    Ok(())
}
