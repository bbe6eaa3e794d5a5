use crate::config::KdfConfig;
use crate::crypto::{self, AesGcmCipher};
use crate::db::models::{DbUser, now_timestamp};
use crate::db::sqlite::Database;
use crate::error::VaultError;
use crate::sql::Params;
use crate::types::user::{User, UserContext};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use std::sync::Arc;
use tracing::{info, warn};

const SELECT_USER_BY_NAME: &str =
    "SELECT id, name, password_hash, kdf_salt, created_at FROM ps_user WHERE name = :name";

#[derive(Clone)]
pub struct UserRepository {
    db: Database,
    kdf: KdfConfig,
}

impl UserRepository {
    pub fn new(db: Database, kdf: KdfConfig) -> Self {
        Self { db, kdf }
    }

    /// Register a new vault owner.
    pub async fn create(&self, name: &str, password: &str) -> Result<User, VaultError> {
        let password_hash = crypto::hash_password(password, &self.kdf)?;
        let salt = STANDARD.encode(crypto::generate_salt());
        let params = Params::named()
            .with("name", name)
            .with("password_hash", password_hash)
            .with("kdf_salt", salt)
            .with("created_at", now_timestamp());

        self.db
            .save_or_update(
                "INSERT INTO ps_user (name, password_hash, kdf_salt, created_at) \
                 VALUES (:name, :password_hash, :kdf_salt, :created_at)",
                params,
            )
            .await
            .map_err(|e| {
                if e.is_unique_violation() {
                    VaultError::DuplicateUser(name.to_string())
                } else {
                    e
                }
            })?;

        let user = self.require(name).await?;
        info!(user_id = user.id, name, "user created");
        Ok(user.try_into()?)
    }

    /// Verify the master password and unlock the user's cipher.
    pub async fn login(&self, name: &str, password: &str) -> Result<UserContext, VaultError> {
        let Some(row) = self.find_row(name).await? else {
            warn!(name, "login for unknown user");
            return Err(VaultError::InvalidCredentials);
        };
        if !crypto::verify_password(password, &row.password_hash)? {
            warn!(name, "login with wrong password");
            return Err(VaultError::InvalidCredentials);
        }
        let salt = STANDARD
            .decode(&row.kdf_salt)
            .map_err(|e| VaultError::Crypto(format!("invalid stored salt: {e}")))?;
        let cipher = AesGcmCipher::from_password(password, &salt, &self.kdf)?;
        Ok(UserContext::new(row.try_into()?, Arc::new(cipher)))
    }

    pub async fn find_by_name(&self, name: &str) -> Result<Option<User>, VaultError> {
        self.find_row(name).await?.map(User::try_from).transpose()
    }

    pub async fn list(&self) -> Result<Vec<User>, VaultError> {
        let rows = self
            .db
            .query(
                "SELECT id, name, password_hash, kdf_salt, created_at FROM ps_user ORDER BY name",
                Params::None,
                DbUser::from_row_ref,
            )
            .await?;
        rows.into_iter().map(User::try_from).collect()
    }

    /// Delete a user with all their services, tags and history.
    pub async fn delete(&self, user_id: i64) -> Result<bool, VaultError> {
        let affected = self
            .db
            .save_or_update(
                "DELETE FROM ps_user WHERE id = :id",
                Params::named().with("id", user_id),
            )
            .await?;
        Ok(affected == 1)
    }

    async fn find_row(&self, name: &str) -> Result<Option<DbUser>, VaultError> {
        self.db
            .optional_row(
                SELECT_USER_BY_NAME,
                Params::named().with("name", name),
                DbUser::from_row_ref,
            )
            .await
    }

    async fn require(&self, name: &str) -> Result<DbUser, VaultError> {
        self.db
            .single_row(
                SELECT_USER_BY_NAME,
                Params::named().with("name", name),
                DbUser::from_row_ref,
            )
            .await
    }
}
