//! Storage error classification.
//!
//! Separates transient failures (lock contention) that are worth retrying
//! from everything else.

use memobot_core::error::MemobotError;

/// Errors from the persistence layer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Lock contention or throttling. Retrying the same operation may succeed.
    #[error("transient storage error: {0}")]
    Transient(String),
    /// Any other storage failure.
    #[error("storage error: {0}")]
    Fatal(String),
}

impl StoreError {
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Transient(_))
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _)
                if matches!(
                    e.code,
                    rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
                ) =>
            {
                StoreError::Transient(err.to_string())
            }
            _ => StoreError::Fatal(err.to_string()),
        }
    }
}

impl From<StoreError> for MemobotError {
    fn from(err: StoreError) -> Self {
        MemobotError::Storage(err.to_string())
    }
}
