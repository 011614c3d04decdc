//! Telegram Bot API client.
//!
//! Implements [`UpdateFetcher`] over `getUpdates` (long polling) and
//! [`ReplySender`] over `sendMessage`.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use memobot_core::config::TelegramConfig;
use memobot_core::types::{InboundMessage, Offset, Update, UserId};

use crate::error::{BotError, FetchError};
use crate::fetcher::{ReplySender, UpdateFetcher};
use crate::response::{split_reply, MAX_REPLY_CHARS};

// =============================================================================
// Wire types
// =============================================================================

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct TgUpdate {
    update_id: Offset,
    #[serde(default)]
    message: Option<TgMessage>,
    #[serde(default)]
    edited_message: Option<TgMessage>,
}

#[derive(Debug, Deserialize)]
struct TgMessage {
    message_id: i64,
    date: i64,
    chat: TgChat,
    #[serde(default)]
    from: Option<TgUser>,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TgChat {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct TgUser {
    #[serde(default)]
    first_name: Option<String>,
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: UserId,
    text: &'a str,
}

impl From<TgUpdate> for Update {
    fn from(update: TgUpdate) -> Self {
        let message = update
            .message
            .or(update.edited_message)
            .map(|m| InboundMessage {
                user_id: m.chat.id,
                provider_message_id: m.message_id,
                text: m.text.unwrap_or_default(),
                timestamp: Utc.timestamp_opt(m.date, 0).single().unwrap_or_default(),
                sender_name: m.from.and_then(|u| u.first_name),
            });
        Update {
            id: update.update_id,
            message,
        }
    }
}

// =============================================================================
// Client
// =============================================================================

#[derive(Debug, Clone)]
pub struct TelegramClient {
    base_url: String,
    poll_timeout_secs: u64,
    request_timeout: Duration,
    http: reqwest::Client,
}

impl TelegramClient {
    pub fn new(config: &TelegramConfig) -> Result<Self, FetchError> {
        let token = config.bot_token.trim();
        if token.is_empty() {
            return Err(FetchError::MissingToken);
        }
        Ok(Self {
            base_url: format!("{}/bot{}", config.api_base.trim_end_matches('/'), token),
            poll_timeout_secs: config.poll_timeout_secs,
            request_timeout: Duration::from_secs(config.request_timeout_secs.max(1)),
            http: reqwest::Client::new(),
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/{}", self.base_url, method)
    }

    async fn decode<T>(response: reqwest::Response) -> Result<T, FetchError>
    where
        T: for<'de> Deserialize<'de>,
    {
        let status = response.status();
        let bytes = response.bytes().await?;
        let body: ApiResponse<T> = match serde_json::from_slice(&bytes) {
            Ok(body) => body,
            Err(e) if status.is_success() => return Err(FetchError::Decode(e.to_string())),
            Err(_) => {
                return Err(FetchError::Http {
                    status: status.as_u16(),
                    body: String::from_utf8_lossy(&bytes).trim().to_string(),
                })
            }
        };
        if !body.ok {
            return Err(FetchError::Api(
                body.description
                    .unwrap_or_else(|| format!("status {}", status.as_u16())),
            ));
        }
        body.result
            .ok_or_else(|| FetchError::Decode("missing result".to_string()))
    }
}

#[async_trait]
impl UpdateFetcher for TelegramClient {
    async fn fetch_updates(&self, since: Option<Offset>) -> Result<Vec<Update>, FetchError> {
        let mut query = vec![("timeout", self.poll_timeout_secs.to_string())];
        if let Some(offset) = since {
            query.push(("offset", (offset + 1).to_string()));
        }

        let response = self
            .http
            .get(self.method_url("getUpdates"))
            .query(&query)
            .timeout(self.request_timeout + Duration::from_secs(self.poll_timeout_secs))
            .send()
            .await?;
        let updates: Vec<TgUpdate> = Self::decode(response).await?;
        debug!(count = updates.len(), since = ?since, "Fetched updates");
        Ok(updates.into_iter().map(Update::from).collect())
    }
}

#[async_trait]
impl ReplySender for TelegramClient {
    /// Send `text`, split into several messages when it is over the
    /// `sendMessage` length limit.
    async fn send_reply(&self, user_id: UserId, text: &str) -> Result<(), BotError> {
        let chunks = split_reply(text, MAX_REPLY_CHARS);
        if chunks.len() > 1 {
            debug!(user_id, parts = chunks.len(), "Splitting long reply");
        }
        for chunk in &chunks {
            let response = self
                .http
                .post(self.method_url("sendMessage"))
                .timeout(self.request_timeout)
                .json(&SendMessageRequest {
                    chat_id: user_id,
                    text: chunk,
                })
                .send()
                .await
                .map_err(|e| BotError::Delivery(e.to_string()))?;
            let _sent: serde_json::Value = Self::decode(response)
                .await
                .map_err(|e| BotError::Delivery(e.to_string()))?;
        }
        Ok(())
    }
}
