use crate::crypto::SecretCipher;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// The logged-in user and the cipher unlocked by their master password.
///
/// Passed explicitly to every repository call.
#[derive(Clone)]
pub struct UserContext {
    pub user: User,
    cipher: Arc<dyn SecretCipher>,
}

impl UserContext {
    pub fn new(user: User, cipher: Arc<dyn SecretCipher>) -> Self {
        Self { user, cipher }
    }

    pub fn user_id(&self) -> i64 {
        self.user.id
    }

    pub fn cipher(&self) -> &dyn SecretCipher {
        self.cipher.as_ref()
    }
}

impl fmt::Debug for UserContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserContext")
            .field("user", &self.user)
            .finish_non_exhaustive()
    }
}
