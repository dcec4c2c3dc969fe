//! bookstore-server: store access, session auth, and the HTTP API
//!
//! - [`db`]: connection pool, schema, and per-entity repositories
//! - [`auth`]: password hashing and opaque session tokens
//! - [`http`]: axum router, JSON envelope, error mapping

pub mod auth;
pub mod db;
pub mod http;

pub use auth::{AuthError, AuthService};
pub use db::{DbError, Store};
pub use http::{run_server, AppState, AuthSettings, ServerConfig};
