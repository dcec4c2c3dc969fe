//! Database layer - connection pool, schema, and repositories
//!
//! # Design Principles
//!
//! - One explicitly constructed [`Store`] handed to every repository; no
//!   process-wide connection handle
//! - Every repository call runs under the store's per-call deadline
//! - Rely on DB constraints, map conflicts to [`DbError::Conflict`] - no
//!   check-then-insert
//! - Transactions for multi-step operations

pub mod migrations;
pub mod pool;
pub mod repos;

use std::future::Future;
use std::time::Duration;

use sqlx::PgPool;

pub use pool::{connect, connect_with, connect_options, ConnectionError, PoolSettings};
pub use repos::*;

/// Database error type
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("not found: {resource} '{id}'")]
    NotFound { resource: &'static str, id: String },

    #[error("{resource} with this {field} already exists")]
    Conflict {
        resource: &'static str,
        field: &'static str,
    },

    #[error("referenced {resource} does not exist")]
    MissingReference { resource: &'static str },

    #[error("database call exceeded the {timeout:?} deadline")]
    Timeout { timeout: Duration },
}

impl DbError {
    pub fn not_found(resource: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            resource,
            id: id.to_string(),
        }
    }

    /// Map a unique-constraint violation to `Conflict`, anything else to `Sqlx`.
    pub fn unique_violation(err: sqlx::Error, resource: &'static str, field: &'static str) -> Self {
        match &err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                Self::Conflict { resource, field }
            }
            _ => Self::Sqlx(err),
        }
    }

    /// Map a foreign-key violation to `MissingReference`, anything else to `Sqlx`.
    pub fn foreign_key_violation(err: sqlx::Error, resource: &'static str) -> Self {
        match &err {
            sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
                Self::MissingReference { resource }
            }
            _ => Self::Sqlx(err),
        }
    }
}

/// Pooled store handle plus the deadline applied to each call.
///
/// Cloning is cheap; the pool is reference counted.
#[derive(Debug, Clone)]
pub struct Store {
    pool: PgPool,
    timeout: Duration,
}

impl Store {
    pub fn new(pool: PgPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run one repository operation under the per-call deadline.
    ///
    /// Waiting for a pooled connection counts against the same deadline, so
    /// an exhausted pool surfaces as `Timeout` rather than blocking forever.
    pub async fn run<T, F>(&self, op: F) -> Result<T, DbError>
    where
        F: Future<Output = Result<T, DbError>>,
    {
        match tokio::time::timeout(self.timeout, op).await {
            Ok(Err(DbError::Sqlx(sqlx::Error::PoolTimedOut))) | Err(_) => Err(DbError::Timeout {
                timeout: self.timeout,
            }),
            Ok(result) => result,
        }
    }
}
