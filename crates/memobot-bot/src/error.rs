//! Error types for the bot core.

use memobot_core::error::MemobotError;
use memobot_storage::StoreError;

use crate::ingest::CyclePhase;

/// A command could not be parsed from the message text.
///
/// Always rendered back to the user; never a system fault.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UsageError {
    /// A required argument is missing. Carries the usage line.
    #[error("Usage: {0}")]
    MissingArgument(&'static str),
    /// An argument is present but malformed.
    #[error("{0}")]
    InvalidArgument(String),
}

/// User-facing command failures, rendered as reply text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("No value found for key '{0}'.")]
    KeyNotFound(String),
    #[error("No message found with id {0}")]
    MessageNotFound(String),
    #[error("{0}")]
    InvalidArgument(String),
    #[error("Usage: {0}")]
    Usage(&'static str),
}

impl From<UsageError> for CommandError {
    fn from(err: UsageError) -> Self {
        match err {
            UsageError::MissingArgument(usage) => CommandError::Usage(usage),
            UsageError::InvalidArgument(msg) => CommandError::InvalidArgument(msg),
        }
    }
}

/// Errors from the update provider.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("bot token is not configured")]
    MissingToken,
    #[error("request failed: {0}")]
    Request(String),
    #[error("http {status}: {body}")]
    Http { status: u16, body: String },
    #[error("provider rejected request: {0}")]
    Api(String),
    #[error("response decode failed: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            FetchError::Decode(err.to_string())
        } else {
            FetchError::Request(err.to_string())
        }
    }
}

/// Errors surfaced inside one ingestion cycle.
#[derive(Debug, thiserror::Error)]
pub enum BotError {
    #[error("fetch error: {0}")]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("reply delivery failed: {0}")]
    Delivery(String),
    #[error("invalid cycle transition: {0:?} -> {1:?}")]
    InvalidTransition(CyclePhase, CyclePhase),
}

impl From<BotError> for MemobotError {
    fn from(err: BotError) -> Self {
        match err {
            BotError::Fetch(e) => MemobotError::Fetch(e.to_string()),
            BotError::Store(e) => MemobotError::Storage(e.to_string()),
            BotError::Delivery(msg) => MemobotError::Delivery(msg),
            other => MemobotError::Storage(other.to_string()),
        }
    }
}
