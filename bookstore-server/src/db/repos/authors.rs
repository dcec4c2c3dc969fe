//! Author repository

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

use crate::db::{DbError, Store};

/// Author record. Zero-valued when a book's author row is missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, FromRow)]
pub struct Author {
    pub id: i32,
    pub author_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Author repository
pub struct AuthorRepo<'a> {
    store: &'a Store,
}

impl<'a> AuthorRepo<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// All authors ordered by name.
    pub async fn get_all(&self) -> Result<Vec<Author>, DbError> {
        self.store
            .run(async {
                let authors = sqlx::query_as::<_, Author>(
                    "SELECT id, author_name, created_at, updated_at FROM authors ORDER BY author_name, id",
                )
                .fetch_all(self.store.pool())
                .await?;
                Ok(authors)
            })
            .await
    }

    pub async fn insert(&self, author_name: &str) -> Result<i32, DbError> {
        self.store
            .run(async {
                let (id,): (i32,) = sqlx::query_as(
                    "INSERT INTO authors (author_name, created_at, updated_at) VALUES ($1, NOW(), NOW()) RETURNING id",
                )
                .bind(author_name)
                .fetch_one(self.store.pool())
                .await?;
                Ok(id)
            })
            .await
    }
}
