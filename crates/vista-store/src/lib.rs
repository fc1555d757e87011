//! # vista-store
//!
//! SQLite persistence for the BoardVista platform.
//!
//! The crate exposes a synchronous [`Database`] handle that wraps a
//! `rusqlite::Connection` and provides typed CRUD helpers for every domain
//! model: users, listings, reviews, and chats with their messages.
//! Schema migrations run automatically whenever a database is opened.

pub mod chats;
pub mod database;
pub mod listings;
pub mod migrations;
pub mod models;
pub mod reviews;
pub mod users;

mod error;

pub use database::Database;
pub use error::StoreError;
pub use models::*;
