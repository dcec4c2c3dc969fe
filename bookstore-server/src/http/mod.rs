//! HTTP server layer
//!
//! Axum server with:
//! - CORS (configured localhost origins by default)
//! - Request tracing
//! - Graceful shutdown
//! - Enveloped JSON responses, errors included

pub mod envelope;
pub mod error;
pub mod extractors;
pub mod routes;
pub mod server;

pub use envelope::Envelope;
pub use error::ApiError;
pub use server::{build_router, run_server, AppState, AuthSettings, ServerConfig, ServerError};
