//! bcrypt password hashing.
//!
//! Hashing and verification are CPU bound, so both run on the blocking
//! thread pool instead of stalling the async workers.

use std::fmt;

/// Default bcrypt work factor
pub const DEFAULT_COST: u32 = bcrypt::DEFAULT_COST;

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("password cannot be empty")]
    Empty,

    #[error("password hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),

    #[error("password hashing task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// A salted bcrypt hash, ready to be stored.
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordHash(String);

impl PasswordHash {
    /// Hash a plaintext password with the given work factor.
    pub async fn generate(plaintext: &str, cost: u32) -> Result<Self, PasswordError> {
        if plaintext.is_empty() {
            return Err(PasswordError::Empty);
        }
        let plaintext = plaintext.to_owned();
        let hashed = tokio::task::spawn_blocking(move || bcrypt::hash(plaintext, cost)).await??;
        Ok(Self(hashed))
    }

    /// Wrap a hash loaded from storage
    pub fn from_stored(hash: impl Into<String>) -> Self {
        Self(hash.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Constant-time check of `plaintext` against this hash.
    pub async fn verify(&self, plaintext: &str) -> Result<bool, PasswordError> {
        let plaintext = plaintext.to_owned();
        let hash = self.0.clone();
        let matches = tokio::task::spawn_blocking(move || bcrypt::verify(plaintext, &hash)).await??;
        Ok(matches)
    }
}

// Keep hashes out of logs
impl fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PasswordHash(..)")
    }
}
