//! Token repository
//!
//! Rows hold only the SHA-256 digest of a session token. Expiry is checked
//! when a token is looked up; `purge_expired` removes dead rows.

use chrono::{DateTime, Utc};
use sqlx::FromRow;

use super::users::User;
use crate::db::{DbError, Store};

/// Token record from database
#[derive(Debug, Clone, FromRow)]
pub struct TokenRecord {
    pub id: i32,
    pub user_id: i32,
    pub email: String,
    pub token_hash: Vec<u8>,
    pub expiry: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Token repository
pub struct TokenRepo<'a> {
    store: &'a Store,
}

impl<'a> TokenRepo<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// Persist a token digest for `user`.
    pub async fn insert(
        &self,
        user: &User,
        token_hash: &[u8],
        expiry: DateTime<Utc>,
    ) -> Result<TokenRecord, DbError> {
        self.store
            .run(async {
                let record = sqlx::query_as::<_, TokenRecord>(
                    r#"
                    INSERT INTO tokens (user_id, email, token_hash, expiry, created_at, updated_at)
                    VALUES ($1, $2, $3, $4, NOW(), NOW())
                    RETURNING id, user_id, email, token_hash, expiry, created_at, updated_at
                    "#,
                )
                .bind(user.id)
                .bind(&user.email)
                .bind(token_hash)
                .bind(expiry)
                .fetch_one(self.store.pool())
                .await
                .map_err(|e| DbError::foreign_key_violation(e, "user"))?;
                Ok(record)
            })
            .await
    }

    /// Find the token row with this digest, expired or not.
    pub async fn get_by_hash(&self, token_hash: &[u8]) -> Result<TokenRecord, DbError> {
        self.store
            .run(async {
                sqlx::query_as::<_, TokenRecord>(
                    r#"
                    SELECT id, user_id, email, token_hash, expiry, created_at, updated_at
                    FROM tokens
                    WHERE token_hash = $1
                    "#,
                )
                .bind(token_hash)
                .fetch_optional(self.store.pool())
                .await?
                .ok_or_else(|| DbError::not_found("token", "<redacted>"))
            })
            .await
    }

    /// Owner of an unexpired token, if any.
    ///
    /// Returns `None` for unknown digests and for rows whose expiry is not
    /// after `now`. The owner's active flag is left to the caller.
    pub async fn owner_if_unexpired(
        &self,
        token_hash: &[u8],
        now: DateTime<Utc>,
    ) -> Result<Option<User>, DbError> {
        self.store
            .run(async {
                let user = sqlx::query_as::<_, User>(
                    r#"
                    SELECT u.id, u.email, u.first_name, u.last_name, u.password,
                           u.user_active, u.created_at, u.updated_at
                    FROM tokens t
                    JOIN users u ON u.id = t.user_id
                    WHERE t.token_hash = $1 AND t.expiry > $2
                    "#,
                )
                .bind(token_hash)
                .bind(now)
                .fetch_optional(self.store.pool())
                .await?;
                Ok(user)
            })
            .await
    }

    /// Delete the row for one token.
    pub async fn delete_by_hash(&self, token_hash: &[u8]) -> Result<(), DbError> {
        self.store
            .run(async {
                let result = sqlx::query("DELETE FROM tokens WHERE token_hash = $1")
                    .bind(token_hash)
                    .execute(self.store.pool())
                    .await?;

                if result.rows_affected() == 0 {
                    return Err(DbError::not_found("token", "<redacted>"));
                }
                Ok(())
            })
            .await
    }

    /// Delete every token owned by `user_id`, returning how many went.
    pub async fn delete_for_user(&self, user_id: i32) -> Result<u64, DbError> {
        self.store
            .run(async {
                let result = sqlx::query("DELETE FROM tokens WHERE user_id = $1")
                    .bind(user_id)
                    .execute(self.store.pool())
                    .await?;
                Ok(result.rows_affected())
            })
            .await
    }

    /// Delete rows whose expiry is at or before `now`.
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, DbError> {
        self.store
            .run(async {
                let result = sqlx::query("DELETE FROM tokens WHERE expiry <= $1")
                    .bind(now)
                    .execute(self.store.pool())
                    .await?;
                Ok(result.rows_affected())
            })
            .await
    }
}
