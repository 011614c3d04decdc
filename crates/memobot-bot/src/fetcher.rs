//! Provider seams: where updates come from and where replies go.

use async_trait::async_trait;
use tracing::info;

use memobot_core::types::{Offset, Update, UserId};

use crate::error::{BotError, FetchError};

/// Source of inbound updates.
#[async_trait]
pub trait UpdateFetcher: Send + Sync {
    /// Updates with id greater than `since`, or all pending updates when
    /// `since` is `None`.
    async fn fetch_updates(&self, since: Option<Offset>) -> Result<Vec<Update>, FetchError>;
}

/// Destination for reply text.
#[async_trait]
pub trait ReplySender: Send + Sync {
    async fn send_reply(&self, user_id: UserId, text: &str) -> Result<(), BotError>;
}

/// Sender that only logs replies.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullReplySender;

#[async_trait]
impl ReplySender for NullReplySender {
    async fn send_reply(&self, user_id: UserId, text: &str) -> Result<(), BotError> {
        info!(user_id, chars = text.chars().count(), "Reply dropped (no sender)");
        Ok(())
    }
}
