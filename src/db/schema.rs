//! SQL DDL for initializing the vault storage.
//! Statements are separated by `;` and applied one by one.

/// SQLite schema with:
/// - `ps_user`: one row per vault owner, Argon2 PHC hash and KDF salt
/// - `services`: credentials, unique per (`name`, `user_id`)
/// - `tags` / `service_tags`: per-user tag names and their links
/// - `services_hist`: audit snapshots written by the event bus listener
///
/// Timestamps are RFC3339 text. `password` and `note` hold base64 ciphertext.
pub const SQLITE_INIT: &str = r#"
CREATE TABLE IF NOT EXISTS ps_user (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    kdf_salt TEXT NOT NULL, -- base64, 16 bytes
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS services (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    username TEXT NOT NULL,
    password TEXT NOT NULL,
    note TEXT NOT NULL,
    last_update TEXT NOT NULL,
    user_id INTEGER NOT NULL REFERENCES ps_user(id) ON DELETE CASCADE,
    UNIQUE (name, user_id)
);

CREATE TABLE IF NOT EXISTS tags (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    user_id INTEGER NOT NULL REFERENCES ps_user(id) ON DELETE CASCADE,
    UNIQUE (name, user_id)
);

CREATE TABLE IF NOT EXISTS service_tags (
    service_id INTEGER NOT NULL REFERENCES services(id) ON DELETE CASCADE,
    tag_id INTEGER NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
    PRIMARY KEY (service_id, tag_id)
);

CREATE TABLE IF NOT EXISTS services_hist (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    username TEXT NOT NULL,
    password TEXT NOT NULL,
    note TEXT NOT NULL,
    tags TEXT NOT NULL, -- JSON array, serialized as text
    last_update TEXT NOT NULL,
    user_id INTEGER NOT NULL REFERENCES ps_user(id) ON DELETE CASCADE,
    action TEXT NOT NULL CHECK (action IN ('insert', 'update', 'delete')),
    action_date TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_services_user_id ON services(user_id);
CREATE INDEX IF NOT EXISTS idx_services_hist_user_id ON services_hist(user_id, action_date)
"#;
