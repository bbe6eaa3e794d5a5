use figment::{
    Figment,
    providers::{Env, Serialized},
};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use crate::service::fuzzy::DEFAULT_MATCH_THRESHOLD;

/// Argon2id cost parameters for master-password hashing and key derivation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KdfConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for KdfConfig {
    fn default() -> Self {
        Self {
            memory_kib: 64 * 1024,
            iterations: 3,
            parallelism: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub max_connections: u32,
    pub loglevel: String,
    /// Minimum fuzzy score for a service to appear in search results.
    pub search_threshold: f64,
    pub kdf: KdfConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite://passvault.sqlite".to_string(),
            max_connections: 5,
            loglevel: "info".to_string(),
            search_threshold: DEFAULT_MATCH_THRESHOLD,
            kdf: KdfConfig::default(),
        }
    }
}

impl Config {
    /// Defaults overlaid with `PASSVAULT_*` variables; nested keys use `__`
    /// (e.g. `PASSVAULT_KDF__MEMORY_KIB`).
    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Env::prefixed("PASSVAULT_").split("__"))
    }

    pub fn load() -> Result<Self, figment::Error> {
        Self::figment().extract()
    }
}

pub static CONFIG: LazyLock<Config> =
    LazyLock::new(|| Config::load().expect("FATAL: invalid PASSVAULT_* configuration"));
