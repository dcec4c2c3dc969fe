//! Axum server setup
//!
//! Server skeleton with:
//! - Localhost-only CORS by default
//! - Tracing middleware
//! - Graceful shutdown on SIGTERM/Ctrl+C

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::HeaderValue;
use axum::Router;
use bookstore_core::{AuthConfig, ServerSection};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::routes;
use crate::auth::AuthService;
use crate::db::Store;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to (default: 127.0.0.1:8081)
    pub bind_addr: SocketAddr,

    /// Allow permissive CORS (default: false = configured origins only)
    ///
    /// WARNING: Setting this to true allows any origin.
    pub cors_permissive: bool,

    /// Origins allowed when not permissive
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8081)),
            cors_permissive: false,
            allowed_origins: vec!["http://localhost:8080".to_string()],
        }
    }
}

impl TryFrom<&ServerSection> for ServerConfig {
    type Error = ServerError;

    fn try_from(section: &ServerSection) -> Result<Self, Self::Error> {
        let bind_addr = section
            .bind
            .parse()
            .map_err(|_| ServerError::InvalidBind(section.bind.clone()))?;
        Ok(Self {
            bind_addr,
            cors_permissive: section.cors_permissive,
            allowed_origins: section.allowed_origins.clone(),
        })
    }
}

/// Session and credential settings used by handlers
#[derive(Debug, Clone, Copy)]
pub struct AuthSettings {
    pub token_ttl: Duration,
    pub bcrypt_cost: u32,
}

impl From<&AuthConfig> for AuthSettings {
    fn from(cfg: &AuthConfig) -> Self {
        Self {
            token_ttl: cfg.token_ttl(),
            bcrypt_cost: cfg.bcrypt_cost,
        }
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub auth: AuthSettings,
}

impl AppState {
    pub fn new(store: Store, auth: AuthSettings) -> Self {
        Self { store, auth }
    }

    pub fn auth_service(&self) -> AuthService<'_> {
        AuthService::new(&self.store, self.auth.bcrypt_cost)
    }
}

/// Build the router with every route, CORS, and tracing attached.
pub fn build_router(state: AppState, config: &ServerConfig) -> Result<Router, ServerError> {
    let cors = if config.cors_permissive {
        tracing::warn!("CORS: Permissive mode enabled - all origins allowed");
        CorsLayer::permissive()
    } else {
        let origins = config
            .allowed_origins
            .iter()
            .map(|origin| {
                origin
                    .parse::<HeaderValue>()
                    .map_err(|_| ServerError::InvalidOrigin(origin.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    };

    Ok(Router::new()
        .merge(routes::health::router())
        .merge(routes::auth::router())
        .merge(routes::users::router())
        .merge(routes::books::router())
        .merge(routes::catalog::router())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state)))
}

/// Run the HTTP server until a shutdown signal arrives.
pub async fn run_server(state: AppState, config: ServerConfig) -> Result<(), ServerError> {
    let app = build_router(state, &config)?;

    let listener = TcpListener::bind(config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
///
/// A handler that cannot be installed is logged and never fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting shutdown");
        }
    }
}

/// Server error type
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid bind address '{0}'")]
    InvalidBind(String),

    #[error("invalid CORS origin '{0}'")]
    InvalidOrigin(String),
}
