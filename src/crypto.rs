//! Encryption of stored secrets and master-password handling.
//!
//! - AES-256-GCM for the `password` and `note` columns, random 96-bit nonce
//!   per value, stored as `base64(nonce || ciphertext || tag)`
//! - Argon2id PHC strings to verify the master password
//! - Argon2id raw output (32 bytes) as the per-user data key

use crate::config::KdfConfig;
use crate::error::VaultError;
use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, AeadCore, KeyInit, OsRng, rand_core::RngCore},
};
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use base64::{Engine as _, engine::general_purpose::STANDARD};

const NONCE_LEN: usize = 12;
pub const KEY_LEN: usize = 32;
pub const SALT_LEN: usize = 16;

/// Encrypts values on their way into the database and back.
pub trait SecretCipher: Send + Sync {
    fn encrypt(&self, plaintext: &str) -> Result<String, VaultError>;
    fn decrypt(&self, ciphertext: &str) -> Result<String, VaultError>;
}

pub struct AesGcmCipher {
    cipher: Aes256Gcm,
}

impl AesGcmCipher {
    pub fn new(key: &[u8; KEY_LEN]) -> Self {
        Self {
            cipher: Aes256Gcm::new(key.into()),
        }
    }

    /// Build the cipher for a user from their master password and stored salt.
    pub fn from_password(password: &str, salt: &[u8], kdf: &KdfConfig) -> Result<Self, VaultError> {
        let key = derive_key(password, salt, kdf)?;
        Ok(Self::new(&key))
    }
}

impl SecretCipher for AesGcmCipher {
    fn encrypt(&self, plaintext: &str) -> Result<String, VaultError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let sealed = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|e| VaultError::Crypto(format!("encryption failed: {e}")))?;

        let mut out = Vec::with_capacity(NONCE_LEN + sealed.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&sealed);
        Ok(STANDARD.encode(out))
    }

    fn decrypt(&self, ciphertext: &str) -> Result<String, VaultError> {
        let raw = STANDARD
            .decode(ciphertext)
            .map_err(|e| VaultError::Crypto(format!("invalid ciphertext encoding: {e}")))?;
        if raw.len() < NONCE_LEN {
            return Err(VaultError::Crypto("ciphertext too short".to_string()));
        }
        let (nonce, sealed) = raw.split_at(NONCE_LEN);
        let plain = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), sealed)
            .map_err(|_| {
                VaultError::Crypto("authentication failed, wrong key or tampered data".to_string())
            })?;
        String::from_utf8(plain).map_err(|e| VaultError::Crypto(format!("invalid utf-8: {e}")))
    }
}

fn argon2(kdf: &KdfConfig) -> Result<Argon2<'static>, VaultError> {
    let params = Params::new(kdf.memory_kib, kdf.iterations, kdf.parallelism, Some(KEY_LEN))
        .map_err(|e| VaultError::Crypto(format!("invalid KDF parameters: {e}")))?;
    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

/// Derive a 32-byte key with Argon2id.
pub fn derive_key(password: &str, salt: &[u8], kdf: &KdfConfig) -> Result<[u8; KEY_LEN], VaultError> {
    let mut key = [0u8; KEY_LEN];
    argon2(kdf)?
        .hash_password_into(password.as_bytes(), salt, &mut key)
        .map_err(|e| VaultError::Crypto(format!("key derivation failed: {e}")))?;
    Ok(key)
}

/// Random salt for `derive_key`.
pub fn generate_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    salt
}

/// Hash a master password into a PHC string.
pub fn hash_password(password: &str, kdf: &KdfConfig) -> Result<String, VaultError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = argon2(kdf)?
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| VaultError::Crypto(format!("password hashing failed: {e}")))?;
    Ok(hash.to_string())
}

/// Check a password against a PHC string. Parameters come from the hash.
pub fn verify_password(password: &str, phc: &str) -> Result<bool, VaultError> {
    let parsed =
        PasswordHash::new(phc).map_err(|e| VaultError::Crypto(format!("invalid hash: {e}")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}
