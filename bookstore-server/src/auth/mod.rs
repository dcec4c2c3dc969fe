//! Authentication: password hashing, opaque session tokens, and the
//! service tying both to the user and token repositories.

pub mod password;
pub mod service;
pub mod token;

pub use password::{PasswordError, PasswordHash};
pub use service::{AuthError, AuthService, IssuedToken};
