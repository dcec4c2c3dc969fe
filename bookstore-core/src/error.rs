/// Structured error types for bookstore-core.
///
/// Library consumers get `thiserror` enums; the `bookstore` binary wraps
/// them in `anyhow` with extra context.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for bookstore-core operations
#[derive(Error, Debug)]
pub enum CoreError {
    /// I/O operation failed
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },

    /// Config file exists but is not valid TOML for our schema
    #[error("Failed to parse config file {path:?}: {source}")]
    ConfigParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// Config parsed but holds an unusable value
    #[error("Configuration error: {reason}")]
    Config { reason: String },
}

/// Result type alias for bookstore-core operations
pub type Result<T> = std::result::Result<T, CoreError>;

impl CoreError {
    /// Create a config parse error
    pub fn config_parse(path: impl Into<PathBuf>, source: toml::de::Error) -> Self {
        Self::ConfigParse {
            path: path.into(),
            source,
        }
    }

    /// Create a config error
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CoreError::config("database.max_connections must be at least 1");
        assert_eq!(
            err.to_string(),
            "Configuration error: database.max_connections must be at least 1"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "denied");
        let err: CoreError = io_err.into();

        assert!(matches!(err, CoreError::Io { .. }));
    }
}
