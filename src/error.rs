use sqlx::Error as SqlxError;
use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum VaultError {
    #[error("SQL template could not be read: {0}")]
    Template(#[source] std::io::Error),

    #[error("Missing SQL parameters: {}", .0.join(", "))]
    MissingParameters(Vec<String>),

    #[error("Unexpected SQL parameters: {}", .0.join(", "))]
    ExtraParameters(Vec<String>),

    #[error("Empty result set")]
    EmptyResultSet,

    #[error("More than one row returned")]
    MoreThanOneRow,

    #[error("Database error: {0}")]
    DatabaseError(#[from] SqlxError),

    #[error("A service named '{0}' already exists")]
    DuplicateService(String),

    #[error("Service '{0}' not found")]
    ServiceNotFound(String),

    #[error("User '{0}' already exists")]
    DuplicateUser(String),

    #[error("Invalid user name or password")]
    InvalidCredentials,

    #[error("Crypto error: {0}")]
    Crypto(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Event bus error: {0}")]
    EventBus(String),
}

impl VaultError {
    /// True when the driver rejected a write because of a UNIQUE constraint.
    pub fn is_unique_violation(&self) -> bool {
        match self {
            VaultError::DatabaseError(e) => e
                .as_database_error()
                .is_some_and(|db| db.is_unique_violation()),
            _ => false,
        }
    }

    /// True for the exactly-one cardinality failures of `single_row`.
    pub fn is_cardinality_violation(&self) -> bool {
        matches!(self, VaultError::EmptyResultSet | VaultError::MoreThanOneRow)
    }
}

impl From<figment::Error> for VaultError {
    fn from(e: figment::Error) -> Self {
        VaultError::Config(Box::new(e))
    }
}
