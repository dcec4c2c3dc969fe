//! User repository
//!
//! - insert: relies on the UNIQUE(email) constraint, surfaced as `Conflict`
//! - update: full overwrite of the mutable profile fields, never the password
//! - reset_password: overwrites the credential only
//! - save_account: profile, credential, and session purge in one transaction

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

use crate::auth::password::PasswordHash;
use crate::db::{DbError, Store};

/// User record from database
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: i32,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    /// bcrypt hash; never serialized
    #[serde(skip_serializing)]
    pub password: String,
    #[sqlx(rename = "user_active")]
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn password_hash(&self) -> PasswordHash {
        PasswordHash::from_stored(self.password.as_str())
    }
}

/// Fields needed to create a user
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password: PasswordHash,
    pub active: bool,
}

const USER_COLUMNS: &str =
    "id, email, first_name, last_name, password, user_active, created_at, updated_at";

/// User repository
pub struct UserRepo<'a> {
    store: &'a Store,
}

impl<'a> UserRepo<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// Look up a user by email.
    pub async fn get_by_email(&self, email: &str) -> Result<User, DbError> {
        self.store
            .run(async {
                sqlx::query_as::<_, User>(&format!(
                    "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
                ))
                .bind(email)
                .fetch_optional(self.store.pool())
                .await?
                .ok_or_else(|| DbError::not_found("user", email))
            })
            .await
    }

    /// Get a single user by id.
    pub async fn get_one(&self, id: i32) -> Result<User, DbError> {
        self.store
            .run(async {
                sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
                    .bind(id)
                    .fetch_optional(self.store.pool())
                    .await?
                    .ok_or_else(|| DbError::not_found("user", id))
            })
            .await
    }

    /// All users, ordered by last name then id.
    pub async fn get_all(&self) -> Result<Vec<User>, DbError> {
        self.store
            .run(async {
                let users = sqlx::query_as::<_, User>(&format!(
                    "SELECT {USER_COLUMNS} FROM users ORDER BY last_name, first_name, id"
                ))
                .fetch_all(self.store.pool())
                .await?;
                Ok(users)
            })
            .await
    }

    /// Insert a user, returning the new id.
    ///
    /// A duplicate email fails with `DbError::Conflict`.
    pub async fn insert(&self, user: &NewUser) -> Result<i32, DbError> {
        self.store
            .run(async {
                let (id,): (i32,) = sqlx::query_as(
                    r#"
                    INSERT INTO users (email, first_name, last_name, password, user_active, created_at, updated_at)
                    VALUES ($1, $2, $3, $4, $5, NOW(), NOW())
                    RETURNING id
                    "#,
                )
                .bind(&user.email)
                .bind(&user.first_name)
                .bind(&user.last_name)
                .bind(user.password.as_str())
                .bind(user.active)
                .fetch_one(self.store.pool())
                .await
                .map_err(|e| DbError::unique_violation(e, "user", "email"))?;

                tracing::debug!(user_id = id, "user inserted");
                Ok(id)
            })
            .await
    }

    /// Overwrite email, names, and active flag. The password is untouched.
    pub async fn update(&self, user: &User) -> Result<(), DbError> {
        self.store
            .run(async {
                let result = sqlx::query(
                    r#"
                    UPDATE users SET
                        email = $1,
                        first_name = $2,
                        last_name = $3,
                        user_active = $4,
                        updated_at = NOW()
                    WHERE id = $5
                    "#,
                )
                .bind(&user.email)
                .bind(&user.first_name)
                .bind(&user.last_name)
                .bind(user.active)
                .bind(user.id)
                .execute(self.store.pool())
                .await
                .map_err(|e| DbError::unique_violation(e, "user", "email"))?;

                if result.rows_affected() == 0 {
                    return Err(DbError::not_found("user", user.id));
                }
                Ok(())
            })
            .await
    }

    /// Overwrite the profile, optionally swap the credential, and optionally
    /// delete the user's tokens, all in one transaction. Returns the number
    /// of tokens removed.
    pub async fn save_account(
        &self,
        user: &User,
        password: Option<&PasswordHash>,
        revoke_tokens: bool,
    ) -> Result<u64, DbError> {
        self.store
            .run(async {
                let mut tx = self.store.pool().begin().await?;

                let result = sqlx::query(
                    r#"
                    UPDATE users SET
                        email = $1,
                        first_name = $2,
                        last_name = $3,
                        user_active = $4,
                        password = COALESCE($5, password),
                        updated_at = NOW()
                    WHERE id = $6
                    "#,
                )
                .bind(&user.email)
                .bind(&user.first_name)
                .bind(&user.last_name)
                .bind(user.active)
                .bind(password.map(PasswordHash::as_str))
                .bind(user.id)
                .execute(&mut *tx)
                .await
                .map_err(|e| DbError::unique_violation(e, "user", "email"))?;

                if result.rows_affected() == 0 {
                    return Err(DbError::not_found("user", user.id));
                }

                let revoked = if revoke_tokens {
                    sqlx::query("DELETE FROM tokens WHERE user_id = $1")
                        .bind(user.id)
                        .execute(&mut *tx)
                        .await?
                        .rows_affected()
                } else {
                    0
                };

                tx.commit().await?;
                Ok(revoked)
            })
            .await
    }

    /// Replace the stored credential only.
    pub async fn reset_password(&self, id: i32, password: &PasswordHash) -> Result<(), DbError> {
        self.store
            .run(async {
                let result = sqlx::query(
                    "UPDATE users SET password = $1, updated_at = NOW() WHERE id = $2",
                )
                .bind(password.as_str())
                .bind(id)
                .execute(self.store.pool())
                .await?;

                if result.rows_affected() == 0 {
                    return Err(DbError::not_found("user", id));
                }
                Ok(())
            })
            .await
    }

    /// Hard delete. Token rows are not touched here; revoke them first.
    pub async fn delete_by_id(&self, id: i32) -> Result<(), DbError> {
        self.store
            .run(async {
                let result = sqlx::query("DELETE FROM users WHERE id = $1")
                    .bind(id)
                    .execute(self.store.pool())
                    .await?;

                if result.rows_affected() == 0 {
                    return Err(DbError::not_found("user", id));
                }
                Ok(())
            })
            .await
    }
}
