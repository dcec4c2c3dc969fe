//! bookstore-core: configuration, slugs, and shared error types.
//!
//! Nothing in here touches the database or HTTP; the server and CLI
//! crates build on it.

pub mod config;
pub mod error;
pub mod slug;

pub use config::{AuthConfig, BookstoreConfig, DatabaseConfig, LoggingConfig, ServerSection};
pub use error::{CoreError, Result};
pub use slug::slugify;
