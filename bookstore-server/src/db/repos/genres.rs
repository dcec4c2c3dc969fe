//! Genre repository

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

use crate::db::{DbError, Store};

/// Genre record
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Genre {
    pub id: i32,
    pub genre_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Genre repository
pub struct GenreRepo<'a> {
    store: &'a Store,
}

impl<'a> GenreRepo<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// All genres ordered by name.
    pub async fn get_all(&self) -> Result<Vec<Genre>, DbError> {
        self.store
            .run(async {
                let genres = sqlx::query_as::<_, Genre>(
                    "SELECT id, genre_name, created_at, updated_at FROM genres ORDER BY genre_name, id",
                )
                .fetch_all(self.store.pool())
                .await?;
                Ok(genres)
            })
            .await
    }

    pub async fn insert(&self, genre_name: &str) -> Result<i32, DbError> {
        self.store
            .run(async {
                let (id,): (i32,) = sqlx::query_as(
                    "INSERT INTO genres (genre_name, created_at, updated_at) VALUES ($1, NOW(), NOW()) RETURNING id",
                )
                .bind(genre_name)
                .fetch_one(self.store.pool())
                .await?;
                Ok(id)
            })
            .await
    }
}
