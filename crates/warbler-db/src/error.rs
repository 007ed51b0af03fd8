use rusqlite::ErrorCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    /// A unique, not-null, foreign-key or check constraint rejected the write.
    #[error("integrity error: {0}")]
    Integrity(String),

    #[error("database error: {0}")]
    Sqlite(rusqlite::Error),

    #[error("database lock poisoned")]
    LockPoisoned,
}

impl DbError {
    pub fn is_integrity(&self) -> bool {
        matches!(self, Self::Integrity(_))
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(err: rusqlite::Error) -> Self {
        if err.sqlite_error_code() == Some(ErrorCode::ConstraintViolation) {
            Self::Integrity(err.to_string())
        } else {
            Self::Sqlite(err)
        }
    }
}

pub type Result<T> = std::result::Result<T, DbError>;
