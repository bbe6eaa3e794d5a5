#![allow(dead_code)]

use passvault::config::{Config, KdfConfig};
use passvault::db::Database;
use passvault::{UserContext, Vault};
use tempfile::TempDir;

/// A vault on a throwaway SQLite file; the file goes away with the struct.
pub struct TestVault {
    pub vault: Vault,
    pub cfg: Config,
    _dir: TempDir,
}

pub fn test_config(dir: &TempDir) -> Config {
    let path = dir.path().join("vault.sqlite");
    Config {
        database_url: format!("sqlite:{}", path.display()),
        // Keep Argon2 cheap so tests stay fast.
        kdf: KdfConfig {
            memory_kib: 1024,
            iterations: 1,
            parallelism: 1,
        },
        ..Config::default()
    }
}

pub async fn database() -> (Database, TempDir) {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let cfg = test_config(&dir);
    let db = Database::connect(&cfg.database_url, cfg.max_connections)
        .await
        .expect("failed to open database");
    (db, dir)
}

pub async fn vault() -> TestVault {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let cfg = test_config(&dir);
    let vault = Vault::open(&cfg).await.expect("failed to open vault");
    TestVault {
        vault,
        cfg,
        _dir: dir,
    }
}

/// Register a user and log them in.
pub async fn login(vault: &Vault, name: &str) -> UserContext {
    vault
        .users
        .create(name, "master-password")
        .await
        .expect("failed to create user");
    vault
        .users
        .login(name, "master-password")
        .await
        .expect("failed to log in")
}
