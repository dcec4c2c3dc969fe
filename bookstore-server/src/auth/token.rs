//! Opaque session tokens.
//!
//! The client receives a random plaintext string exactly once; the store
//! only ever sees its SHA-256 digest.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Random bytes per token (128 bits)
const TOKEN_BYTES: usize = 16;

/// Length of the encoded plaintext
pub const TOKEN_LEN: usize = 22;

/// Generate a fresh plaintext token from OS randomness
pub fn generate_plaintext() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Digest stored in `tokens.token_hash`
pub fn hash_token(plaintext: &str) -> Vec<u8> {
    Sha256::digest(plaintext.as_bytes()).to_vec()
}

/// Cheap shape check before touching the store
pub fn is_well_formed(plaintext: &str) -> bool {
    plaintext.len() == TOKEN_LEN
        && plaintext
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}
