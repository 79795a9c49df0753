use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid points configuration: {reason}")]
    Config { reason: String },

    #[error("Unknown activity kind '{0}'")]
    UnknownActivityKind(String),

    #[error("Cannot sort admin summary by '{field}'")]
    InvalidSort { field: String },

    #[error("Stored value is corrupt: {0}")]
    Corrupt(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl LedgerError {
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config { reason: reason.into() }
    }

    /// True for lock contention that clears up on its own (SQLITE_BUSY / SQLITE_LOCKED).
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Database(rusqlite::Error::SqliteFailure(e, _)) => matches!(
                e.code,
                rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
            ),
            _ => false,
        }
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;
