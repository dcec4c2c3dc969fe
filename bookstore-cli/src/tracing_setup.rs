//! Tracing setup for the bookstore CLI
//!
//! Usage:
//!   bookstore --debug ...                  # Debug logging to console
//!   RUST_LOG=bookstore_server=debug ...    # Fine-grained log control
//!
//! Precedence: RUST_LOG, then --debug, then `logging.level` from config.

use anyhow::{anyhow, Result};
use tracing_subscriber::EnvFilter;

/// Tracing configuration options
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Force debug level unless RUST_LOG is set
    pub debug: bool,
    /// Level used when neither RUST_LOG nor --debug applies
    pub default_level: String,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            debug: false,
            default_level: "info".to_string(),
        }
    }
}

impl TracingConfig {
    fn fallback_directive(&self) -> &str {
        if self.debug {
            "debug"
        } else {
            &self.default_level
        }
    }
}

/// Initialize console tracing
pub fn init(config: &TracingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.fallback_directive()))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(config.debug) // Show targets in debug mode
        .compact()
        .try_init()
        .map_err(|err| anyhow!(err))
}
