//! Inspect the effective configuration

use anyhow::Result;
use bookstore_core::BookstoreConfig;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print the merged configuration with secrets masked
    Show,
    /// Print the default config file location
    Path,
}

pub fn run_config(args: ConfigArgs, cfg: &BookstoreConfig) -> Result<()> {
    match args.command {
        ConfigCommands::Show => print!("{}", cfg.to_redacted_toml()?),
        ConfigCommands::Path => println!("{}", BookstoreConfig::config_path().display()),
    }
    Ok(())
}
