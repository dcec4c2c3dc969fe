//! Route handlers organized by resource

pub mod auth;
pub mod books;
pub mod catalog;
pub mod health;
pub mod users;
