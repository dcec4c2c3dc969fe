//! Database connection pool management
//!
//! Uses sqlx PgPool with explicit bounds: at most 5 connections (open or
//! idle) and a 5 minute maximum connection lifetime by default. The pool
//! is probed once right after it is built; a failed probe is fatal.

use std::str::FromStr;
use std::time::Duration;

use bookstore_core::DatabaseConfig;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};
use sqlx::{Connection, PgPool};

const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_MAX_LIFETIME: Duration = Duration::from_secs(5 * 60);
const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(3);
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Pool bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSettings {
    /// Maximum open connections; idle connections count against it too
    pub max_connections: u32,
    /// Connections older than this are closed and replaced
    pub max_lifetime: Duration,
    /// How long a caller waits for a free connection
    pub acquire_timeout: Duration,
    /// Deadline for the start-up liveness probe
    pub connect_timeout: Duration,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
            max_lifetime: DEFAULT_MAX_LIFETIME,
            acquire_timeout: DEFAULT_ACQUIRE_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

impl From<&DatabaseConfig> for PoolSettings {
    fn from(cfg: &DatabaseConfig) -> Self {
        Self {
            max_connections: cfg.max_connections,
            max_lifetime: cfg.max_lifetime(),
            acquire_timeout: cfg.query_timeout(),
            connect_timeout: cfg.connect_timeout(),
        }
    }
}

/// Failure to bring up the store at start-up
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("invalid connection string: {0}")]
    InvalidDsn(#[source] sqlx::Error),

    #[error("invalid sslmode '{0}'")]
    InvalidSslMode(String),

    #[error("database unreachable: {0}")]
    Unreachable(#[source] sqlx::Error),

    #[error("database did not answer the liveness probe within {0:?}")]
    ProbeTimeout(Duration),
}

/// Build connect options from config.
///
/// `url` wins when present; otherwise host, port, credentials, database
/// name, TLS mode, and session timezone are taken from the discrete fields.
pub fn connect_options(cfg: &DatabaseConfig) -> Result<PgConnectOptions, ConnectionError> {
    if let Some(ref url) = cfg.url {
        return PgConnectOptions::from_str(url).map_err(ConnectionError::InvalidDsn);
    }

    let ssl_mode = PgSslMode::from_str(&cfg.sslmode)
        .map_err(|_| ConnectionError::InvalidSslMode(cfg.sslmode.clone()))?;

    let mut options = PgConnectOptions::new()
        .host(&cfg.host)
        .port(cfg.port)
        .username(&cfg.user)
        .database(&cfg.dbname)
        .ssl_mode(ssl_mode)
        .options([("timezone", cfg.timezone.as_str())]);
    if !cfg.password.is_empty() {
        options = options.password(&cfg.password);
    }
    Ok(options)
}

/// Create a PostgreSQL connection pool from a connection URL and verify
/// that the database answers.
///
/// # Example
///
/// ```ignore
/// let pool = connect("postgres://localhost/bookstore", PoolSettings::default()).await?;
/// ```
pub async fn connect(dsn: &str, settings: PoolSettings) -> Result<PgPool, ConnectionError> {
    let options = PgConnectOptions::from_str(dsn).map_err(ConnectionError::InvalidDsn)?;
    connect_with(options, settings).await
}

/// Create a pool from prepared options and run the liveness probe.
pub async fn connect_with(
    options: PgConnectOptions,
    settings: PoolSettings,
) -> Result<PgPool, ConnectionError> {
    let pool = PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .min_connections(0)
        .max_lifetime(settings.max_lifetime)
        .acquire_timeout(settings.acquire_timeout)
        .connect_lazy_with(options);

    ping(&pool, settings.connect_timeout).await?;
    Ok(pool)
}

/// Acquire one connection and ping it.
async fn ping(pool: &PgPool, deadline: Duration) -> Result<(), ConnectionError> {
    let probe = async {
        let mut conn = pool.acquire().await?;
        conn.ping().await
    };

    match tokio::time::timeout(deadline, probe).await {
        Ok(Ok(())) => {
            tracing::info!("pinged database successfully");
            Ok(())
        }
        Ok(Err(e)) => {
            tracing::error!(error = %e, "database liveness probe failed");
            Err(ConnectionError::Unreachable(e))
        }
        Err(_) => {
            tracing::error!(timeout = ?deadline, "database liveness probe timed out");
            Err(ConnectionError::ProbeTimeout(deadline))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_follow_config() {
        let mut cfg = DatabaseConfig::default();
        cfg.max_connections = 8;
        cfg.query_timeout_secs = 2;
        let settings = PoolSettings::from(&cfg);

        assert_eq!(settings.max_connections, 8);
        assert_eq!(settings.acquire_timeout, Duration::from_secs(2));
        assert_eq!(settings.max_lifetime, Duration::from_secs(300));
    }

    #[test]
    fn default_settings_bound_the_pool() {
        let settings = PoolSettings::default();
        assert_eq!(settings.max_connections, 5);
        assert_eq!(settings.max_lifetime, Duration::from_secs(300));
    }

    #[test]
    fn options_from_discrete_fields() {
        let mut cfg = DatabaseConfig::default();
        cfg.host = "db.internal".to_string();
        cfg.port = 5433;
        cfg.dbname = "vueapi".to_string();

        let options = connect_options(&cfg).unwrap();
        assert_eq!(options.get_host(), "db.internal");
        assert_eq!(options.get_port(), 5433);
        assert_eq!(options.get_database(), Some("vueapi"));
    }

    #[test]
    fn url_wins_over_fields() {
        let mut cfg = DatabaseConfig::default();
        cfg.host = "ignored".to_string();
        cfg.url = Some("postgres://app@urlhost:6543/books".to_string());

        let options = connect_options(&cfg).unwrap();
        assert_eq!(options.get_host(), "urlhost");
        assert_eq!(options.get_port(), 6543);
    }

    #[test]
    fn rejects_unknown_sslmode() {
        let mut cfg = DatabaseConfig::default();
        cfg.sslmode = "sometimes".to_string();
        assert!(matches!(
            connect_options(&cfg),
            Err(ConnectionError::InvalidSslMode(_))
        ));
    }

    #[tokio::test]
    async fn unreachable_database_fails_fast() {
        // Port 1 on localhost refuses connections
        let settings = PoolSettings {
            connect_timeout: Duration::from_secs(2),
            acquire_timeout: Duration::from_secs(1),
            ..PoolSettings::default()
        };
        let err = connect("postgres://postgres@127.0.0.1:1/bookstore", settings)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ConnectionError::Unreachable(_) | ConnectionError::ProbeTimeout(_)
        ));
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn pool_acquires_connection() {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
        let pool = connect(&url, PoolSettings::default())
            .await
            .expect("pool creation failed");

        let result: (i32,) = sqlx::query_as("SELECT 1")
            .fetch_one(&pool)
            .await
            .expect("query failed");

        assert_eq!(result.0, 1);
    }
}
