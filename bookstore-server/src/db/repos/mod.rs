//! Repository implementations for database access
//!
//! Each repository follows these patterns:
//! - Borrows the shared [`Store`](crate::db::Store); every call runs under its deadline
//! - Batches child lookups for list operations (no N+1)
//! - Maps constraint violations to typed errors (no check-then-insert)
//! - Uses transactions for multi-step writes

pub mod authors;
pub mod books;
pub mod genres;
pub mod tokens;
pub mod users;

pub use authors::{Author, AuthorRepo};
pub use books::{Book, BookInput, BookRepo};
pub use genres::{Genre, GenreRepo};
pub use tokens::{TokenRecord, TokenRepo};
pub use users::{NewUser, User, UserRepo};
