//! REST API over SQLite for users and the directed friendships between them.
//!
//! The router from [`app`] is backed by any [`database::Database`];
//! [`databases::SqliteDatabase`] is the only storage implementation.

pub mod config;
pub mod database;
pub mod databases;
pub mod err;
pub mod extract;
pub mod routes;

pub use routes::{AppState, app};
