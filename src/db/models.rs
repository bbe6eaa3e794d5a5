use crate::crypto::SecretCipher;
use crate::error::VaultError;
use crate::types::service::Service;
use crate::types::user::User;
use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};

/// A service as stored: `password` and `note` are ciphertext.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DbService {
    pub name: String,
    pub username: String,
    pub password: String,
    pub note: String,
    pub tags: Vec<String>,
    pub last_update: DateTime<Utc>,
    pub user_id: i64,
}

impl DbService {
    /// Encrypt the sensitive fields of `service`.
    pub fn seal(service: &Service, cipher: &dyn SecretCipher) -> Result<Self, VaultError> {
        Ok(Self {
            name: service.name.clone(),
            username: service.username.clone(),
            password: cipher.encrypt(&service.password)?,
            note: cipher.encrypt(&service.note)?,
            tags: service.tags.iter().cloned().collect(),
            last_update: service.last_update,
            user_id: service.user_id,
        })
    }

    /// Decrypt back into a clean (not dirty) `Service`.
    pub fn open(self, cipher: &dyn SecretCipher) -> Result<Service, VaultError> {
        Ok(Service {
            password: cipher.decrypt(&self.password)?,
            note: cipher.decrypt(&self.note)?,
            name: self.name,
            username: self.username,
            tags: self.tags.into_iter().collect(),
            last_update: self.last_update,
            user_id: self.user_id,
            dirty: false,
            score: 0.0,
        })
    }

    /// Map a `services` row; tags are attached by the caller.
    pub(crate) fn from_service_row(row: &SqliteRow) -> Result<(i64, Self), VaultError> {
        let id: i64 = row.try_get("id")?;
        let last_update: String = row.try_get("last_update")?;
        Ok((
            id,
            Self {
                name: row.try_get("name")?,
                username: row.try_get("username")?,
                password: row.try_get("password")?,
                note: row.try_get("note")?,
                tags: Vec::new(),
                last_update: parse_timestamp(&last_update)?,
                user_id: row.try_get("user_id")?,
            },
        ))
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct DbUser {
    pub id: i64,
    pub name: String,
    pub password_hash: String,
    pub kdf_salt: String,
    pub created_at: String,
}

impl DbUser {
    pub fn from_row_ref(row: &SqliteRow) -> Result<Self, VaultError> {
        Ok(Self::from_row(row)?)
    }
}

impl TryFrom<DbUser> for User {
    type Error = VaultError;

    fn try_from(d: DbUser) -> Result<Self, Self::Error> {
        Ok(User {
            id: d.id,
            created_at: parse_timestamp(&d.created_at)?,
            name: d.name,
        })
    }
}

/// Current time at the precision timestamps are stored with.
pub(crate) fn now_timestamp() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Parse an RFC3339 column value.
pub(crate) fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, VaultError> {
    let parsed = DateTime::parse_from_rfc3339(value)
        .map_err(|e| sqlx::Error::Decode(Box::new(e)))?
        .with_timezone(&Utc);
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{AesGcmCipher, KEY_LEN};

    #[test]
    fn seal_hides_secrets_and_open_restores_them() {
        let cipher = AesGcmCipher::new(&[9u8; KEY_LEN]);
        let service = Service::new(4, "bank", "alice", "s3cret")
            .with_note("pin 1234")
            .with_tags(["money"]);

        let sealed = DbService::seal(&service, &cipher).expect("seal");
        assert_ne!(sealed.password, "s3cret");
        assert_ne!(sealed.note, "pin 1234");
        assert_eq!(sealed.tags, ["money"]);

        let opened = sealed.open(&cipher).expect("open");
        assert_eq!(opened.password, "s3cret");
        assert_eq!(opened.note, "pin 1234");
        assert!(!opened.dirty);
        assert_eq!(opened.last_update, service.last_update);
    }

    #[test]
    fn stored_timestamps_keep_their_value() {
        let now = now_timestamp();
        let crate::sql::SqlValue::Text(text) = now.into() else {
            panic!("timestamps bind as text");
        };
        assert_eq!(parse_timestamp(&text).expect("parse"), now);
    }

    #[test]
    fn bad_timestamps_are_decode_errors() {
        let err = parse_timestamp("yesterday").unwrap_err();
        assert!(matches!(err, VaultError::DatabaseError(sqlx::Error::Decode(_))));
    }
}
