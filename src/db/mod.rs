//! Database module: schema, row models and the repositories built on them.
//!
//! Layout:
//! - `schema.rs`: SQL DDL for initializing the database (SQLite-first)
//! - `models.rs`: Rust structs mirroring DB rows and conversions
//! - `sqlite.rs`: pool wrapper and transaction scope
//! - `services.rs`, `users.rs`, `tags.rs`, `history.rs`: repositories

pub mod history;
pub mod models;
pub mod schema;
pub mod services;
pub mod sqlite;
pub mod tags;
pub mod users;

pub use history::HistoryRepository;
pub use models::{DbService, DbUser};
pub use schema::SQLITE_INIT;
pub use services::ServiceRepository;
pub use sqlite::{Database, SqlitePool};
pub use tags::TagRepository;
pub use users::UserRepository;
