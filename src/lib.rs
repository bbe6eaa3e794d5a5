pub mod config;
pub mod crypto;
pub mod db;
pub mod error;
pub mod service;
pub mod sql;
pub mod types;
pub mod vault;

pub use error::VaultError;
pub use types::{Service, User, UserContext};
pub use vault::Vault;
