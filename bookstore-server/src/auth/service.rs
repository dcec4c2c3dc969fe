//! Login, token issue/validate/revoke, and credential changes.
//!
//! Token lifecycle: issued -> valid -> expired | revoked. Expiry is checked
//! on lookup; nothing ever makes a token valid again.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::OnceCell;

use super::password::{PasswordError, PasswordHash};
use super::token;
use crate::db::{DbError, NewUser, Store, TokenRepo, User, UserRepo};

/// Verified against when the email is unknown, so both failure paths pay
/// for one bcrypt comparison.
static DUMMY_HASH: OnceCell<PasswordHash> = OnceCell::const_new();

async fn dummy_hash(cost: u32) -> Result<&'static PasswordHash, PasswordError> {
    DUMMY_HASH
        .get_or_try_init(|| PasswordHash::generate("unused-credential", cost))
        .await
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Unknown email, wrong password, or an unusable stored hash.
    #[error("invalid username/password")]
    InvalidCredentials,

    #[error("user is not active")]
    AccountInactive,

    #[error("invalid or expired token")]
    InvalidToken,

    #[error(transparent)]
    Store(#[from] DbError),

    #[error(transparent)]
    Password(#[from] PasswordError),
}

/// A freshly issued session token. The plaintext exists only here.
#[derive(Debug, Clone, Serialize)]
pub struct IssuedToken {
    pub token: String,
    pub user_id: i32,
    pub email: String,
    pub expiry: DateTime<Utc>,
}

/// Auth operations over a borrowed store
pub struct AuthService<'a> {
    store: &'a Store,
    bcrypt_cost: u32,
}

impl<'a> AuthService<'a> {
    pub fn new(store: &'a Store, bcrypt_cost: u32) -> Self {
        Self { store, bcrypt_cost }
    }

    /// Check credentials and return the matching active user.
    ///
    /// A missing user and a wrong password are indistinguishable to the caller.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let user = match UserRepo::new(self.store).get_by_email(email).await {
            Ok(user) => user,
            Err(DbError::NotFound { .. }) => {
                self.verify_dummy(password).await;
                return Err(AuthError::InvalidCredentials);
            }
            Err(e) => return Err(e.into()),
        };

        match user.password_hash().verify(password).await {
            Ok(true) => {}
            Ok(false) => return Err(AuthError::InvalidCredentials),
            Err(e) => {
                tracing::warn!(user_id = user.id, error = %e, "stored password hash unusable");
                return Err(AuthError::InvalidCredentials);
            }
        }

        if !user.active {
            return Err(AuthError::AccountInactive);
        }

        Ok(user)
    }

    /// Spend the same bcrypt work as a real mismatch.
    async fn verify_dummy(&self, password: &str) {
        match dummy_hash(self.bcrypt_cost).await {
            Ok(hash) => {
                let _ = hash.verify(password).await;
            }
            Err(e) => tracing::warn!(error = %e, "dummy password hash unavailable"),
        }
    }

    /// Issue a token for `user` valid for `ttl`, persisting only its digest.
    pub async fn issue_token(&self, user: &User, ttl: Duration) -> Result<IssuedToken, AuthError> {
        let plaintext = token::generate_plaintext();
        let expiry = expiry_after(Utc::now(), ttl);

        TokenRepo::new(self.store)
            .insert(user, &token::hash_token(&plaintext), expiry)
            .await?;

        tracing::info!(user_id = user.id, %expiry, "token issued");
        Ok(IssuedToken {
            token: plaintext,
            user_id: user.id,
            email: user.email.clone(),
            expiry,
        })
    }

    /// Delete the row for `plaintext`.
    pub async fn revoke(&self, plaintext: &str) -> Result<(), AuthError> {
        if !token::is_well_formed(plaintext) {
            return Err(AuthError::InvalidToken);
        }

        match TokenRepo::new(self.store)
            .delete_by_hash(&token::hash_token(plaintext))
            .await
        {
            Ok(()) => Ok(()),
            Err(DbError::NotFound { .. }) => Err(AuthError::InvalidToken),
            Err(e) => Err(e.into()),
        }
    }

    /// Log a user out everywhere. Returns the number of tokens removed.
    pub async fn revoke_all_for_user(&self, user_id: i32) -> Result<u64, AuthError> {
        let removed = TokenRepo::new(self.store).delete_for_user(user_id).await?;
        tracing::info!(user_id, removed, "revoked all tokens");
        Ok(removed)
    }

    /// `Ok(true)` only for a known, unexpired token whose owner is active.
    ///
    /// Store failures are returned as errors, never folded into `false`.
    pub async fn validate(&self, plaintext: &str) -> Result<bool, AuthError> {
        match self.user_for_token(plaintext).await {
            Ok(_) => Ok(true),
            Err(AuthError::InvalidToken) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Resolve a bearer token to its active owner.
    pub async fn user_for_token(&self, plaintext: &str) -> Result<User, AuthError> {
        if !token::is_well_formed(plaintext) {
            return Err(AuthError::InvalidToken);
        }

        let owner = TokenRepo::new(self.store)
            .owner_if_unexpired(&token::hash_token(plaintext), Utc::now())
            .await?;

        match owner {
            Some(user) if user.active => Ok(user),
            _ => Err(AuthError::InvalidToken),
        }
    }

    /// Hash `plaintext` and replace the user's stored credential.
    pub async fn reset_password(&self, user_id: i32, plaintext: &str) -> Result<(), AuthError> {
        let hash = PasswordHash::generate(plaintext, self.bcrypt_cost).await?;
        UserRepo::new(self.store).reset_password(user_id, &hash).await?;
        tracing::info!(user_id, "password reset");
        Ok(())
    }

    /// Save profile edits, an optional new password, and, when
    /// `revoke_tokens` is set, the end of every session as one write.
    pub async fn update_account(
        &self,
        user: &User,
        new_password: Option<&str>,
        revoke_tokens: bool,
    ) -> Result<u64, AuthError> {
        let hash = match new_password {
            Some(plaintext) => Some(PasswordHash::generate(plaintext, self.bcrypt_cost).await?),
            None => None,
        };
        let revoked = UserRepo::new(self.store)
            .save_account(user, hash.as_ref(), revoke_tokens)
            .await?;

        tracing::info!(
            user_id = user.id,
            password_changed = hash.is_some(),
            revoked,
            "account updated"
        );
        Ok(revoked)
    }

    /// Hash the initial password and insert the user, returning its id.
    pub async fn create_user(
        &self,
        email: &str,
        first_name: &str,
        last_name: &str,
        password: &str,
        active: bool,
    ) -> Result<i32, AuthError> {
        let password = PasswordHash::generate(password, self.bcrypt_cost).await?;
        let id = UserRepo::new(self.store)
            .insert(&NewUser {
                email: email.to_string(),
                first_name: first_name.to_string(),
                last_name: last_name.to_string(),
                password,
                active,
            })
            .await?;
        Ok(id)
    }

    /// Remove expired token rows.
    pub async fn purge_expired(&self) -> Result<u64, AuthError> {
        let purged = TokenRepo::new(self.store).purge_expired(Utc::now()).await?;
        tracing::info!(purged, "expired tokens purged");
        Ok(purged)
    }
}

/// `now + ttl`, saturating at the far future instead of overflowing.
fn expiry_after(now: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(ttl)
        .ok()
        .and_then(|ttl| now.checked_add_signed(ttl))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repos::test_support::{test_store, unique_email};

    const COST: u32 = 4;

    #[test]
    fn expiry_adds_ttl() {
        let now = Utc::now();
        let expiry = expiry_after(now, Duration::from_secs(24 * 60 * 60));
        assert_eq!(expiry - now, chrono::Duration::hours(24));
        assert_eq!(expiry_after(now, Duration::ZERO), now);
    }

    #[test]
    fn expiry_saturates() {
        assert_eq!(
            expiry_after(Utc::now(), Duration::MAX),
            DateTime::<Utc>::MAX_UTC
        );
    }

    #[test]
    fn credential_errors_share_one_message() {
        assert_eq!(
            AuthError::InvalidCredentials.to_string(),
            "invalid username/password"
        );
    }

    #[tokio::test]
    async fn dummy_hash_never_matches() {
        let hash = dummy_hash(COST).await.unwrap();
        assert!(hash.as_str().starts_with("$2"));
        assert!(!hash.verify("").await.unwrap_or(false));
        assert!(!hash.verify("s3cret").await.unwrap());
        // Built once, then reused
        assert!(std::ptr::eq(hash, dummy_hash(COST).await.unwrap()));
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn unknown_email_pays_for_a_bcrypt_check() {
        let store = test_store().await;
        let auth = AuthService::new(&store, 10);
        dummy_hash(10).await.unwrap();

        let started = std::time::Instant::now();
        let result = auth.authenticate(&unique_email(), "s3cret").await;
        let login = started.elapsed();
        assert!(matches!(result, Err(AuthError::InvalidCredentials)));

        let expected = std::time::Instant::now();
        let _ = dummy_hash(10).await.unwrap().verify("s3cret").await;
        assert!(login >= expected.elapsed() / 2);
    }

    async fn seeded(auth: &AuthService<'_>, password: &str) -> User {
        let store = auth.store;
        let id = auth
            .create_user(&unique_email(), "Grace", "Hopper", password, true)
            .await
            .unwrap();
        UserRepo::new(store).get_one(id).await.unwrap()
    }

    #[tokio::test]
    async fn malformed_token_is_rejected_without_store() {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy("postgres://localhost/bookstore_unused")
            .unwrap();
        let store = Store::new(pool, Duration::from_secs(1));
        let auth = AuthService::new(&store, COST);

        assert!(!auth.validate("not a token").await.unwrap());
        assert!(matches!(auth.revoke("").await, Err(AuthError::InvalidToken)));
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn authenticate_rejects_wrong_password_and_unknown_email() {
        let store = test_store().await;
        let auth = AuthService::new(&store, COST);
        let user = seeded(&auth, "s3cret").await;

        let found = auth.authenticate(&user.email, "s3cret").await.unwrap();
        assert_eq!(found.id, user.id);

        assert!(matches!(
            auth.authenticate(&user.email, "wrong").await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            auth.authenticate(&unique_email(), "s3cret").await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn inactive_user_cannot_log_in() {
        let store = test_store().await;
        let auth = AuthService::new(&store, COST);
        let mut user = seeded(&auth, "s3cret").await;

        user.active = false;
        UserRepo::new(&store).update(&user).await.unwrap();

        assert!(matches!(
            auth.authenticate(&user.email, "s3cret").await,
            Err(AuthError::AccountInactive)
        ));
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn issue_validate_revoke() {
        let store = test_store().await;
        let auth = AuthService::new(&store, COST);
        let user = seeded(&auth, "s3cret").await;

        let issued = auth
            .issue_token(&user, Duration::from_secs(60 * 60))
            .await
            .unwrap();
        assert!(auth.validate(&issued.token).await.unwrap());
        assert_eq!(auth.user_for_token(&issued.token).await.unwrap().id, user.id);

        auth.revoke(&issued.token).await.unwrap();
        assert!(!auth.validate(&issued.token).await.unwrap());
        assert!(matches!(
            auth.revoke(&issued.token).await,
            Err(AuthError::InvalidToken)
        ));
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn zero_ttl_token_is_invalid() {
        let store = test_store().await;
        let auth = AuthService::new(&store, COST);
        let user = seeded(&auth, "s3cret").await;

        let issued = auth.issue_token(&user, Duration::ZERO).await.unwrap();
        assert!(!auth.validate(&issued.token).await.unwrap());
        assert!(auth.purge_expired().await.unwrap() >= 1);
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn deactivation_invalidates_every_session() {
        let store = test_store().await;
        let auth = AuthService::new(&store, COST);
        let mut user = seeded(&auth, "s3cret").await;
        let ttl = Duration::from_secs(60 * 60);

        let first = auth.issue_token(&user, ttl).await.unwrap();
        let second = auth.issue_token(&user, ttl).await.unwrap();

        user.active = false;
        UserRepo::new(&store).update(&user).await.unwrap();
        assert_eq!(auth.revoke_all_for_user(user.id).await.unwrap(), 2);

        assert!(!auth.validate(&first.token).await.unwrap());
        assert!(!auth.validate(&second.token).await.unwrap());
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn failed_account_update_keeps_sessions_and_password() {
        let store = test_store().await;
        let auth = AuthService::new(&store, COST);
        let other = seeded(&auth, "other").await;
        let mut user = seeded(&auth, "old-pass").await;
        let issued = auth
            .issue_token(&user, Duration::from_secs(60 * 60))
            .await
            .unwrap();

        user.email = other.email.clone();
        user.active = false;
        let result = auth.update_account(&user, Some("new-pass"), true).await;
        assert!(matches!(
            result,
            Err(AuthError::Store(DbError::Conflict { .. }))
        ));

        assert!(auth.validate(&issued.token).await.unwrap());
        let reloaded = UserRepo::new(&store).get_one(user.id).await.unwrap();
        assert!(reloaded.active);
        assert!(reloaded.password_hash().verify("old-pass").await.unwrap());
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn account_update_can_end_sessions() {
        let store = test_store().await;
        let auth = AuthService::new(&store, COST);
        let mut user = seeded(&auth, "old-pass").await;
        let issued = auth
            .issue_token(&user, Duration::from_secs(60 * 60))
            .await
            .unwrap();

        user.active = false;
        assert_eq!(auth.update_account(&user, Some("new-pass"), true).await.unwrap(), 1);
        assert!(!auth.validate(&issued.token).await.unwrap());
        assert!(matches!(
            auth.authenticate(&user.email, "new-pass").await,
            Err(AuthError::AccountInactive)
        ));
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn reset_password_changes_login() {
        let store = test_store().await;
        let auth = AuthService::new(&store, COST);
        let user = seeded(&auth, "old-pass").await;

        auth.reset_password(user.id, "new-pass").await.unwrap();
        assert!(auth.authenticate(&user.email, "new-pass").await.is_ok());
        assert!(matches!(
            auth.authenticate(&user.email, "old-pass").await,
            Err(AuthError::InvalidCredentials)
        ));
    }
}
