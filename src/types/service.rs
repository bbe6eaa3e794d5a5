use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A stored credential, decrypted. Identity is (`name`, `user_id`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub name: String,
    pub username: String,
    pub password: String,
    pub note: String,
    pub tags: BTreeSet<String>,
    pub last_update: DateTime<Utc>,
    pub user_id: i64,
    /// Edited in memory but not yet saved.
    #[serde(skip)]
    pub dirty: bool,
    /// Relevance of the last search that returned this service.
    #[serde(skip)]
    pub score: f64,
}

impl Service {
    pub fn new(
        user_id: i64,
        name: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            username: username.into(),
            password: password.into(),
            note: String::new(),
            tags: BTreeSet::new(),
            last_update: Utc::now(),
            user_id,
            dirty: true,
            score: 0.0,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = note.into();
        self
    }

    /// Blank names are dropped; surrounding whitespace is trimmed.
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.tags = tags
            .into_iter()
            .map(|t| t.as_ref().trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        self
    }
}

/// A tag and the number of services that carry it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Tag {
    pub name: String,
    pub count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_are_trimmed_and_deduplicated() {
        let s = Service::new(1, "mail", "me", "pw").with_tags(["work", " work ", "", "home"]);
        assert_eq!(
            s.tags.iter().map(String::as_str).collect::<Vec<_>>(),
            ["home", "work"]
        );
        assert!(s.dirty);
    }
}
