use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Identifiers
// =============================================================================

/// Identifier of an inbound update, as assigned by the messaging provider.
///
/// The persisted cursor is the highest `Offset` fully processed.
pub type Offset = i64;

/// Identifier of a chat user (the provider's chat id).
pub type UserId = i64;

/// Store-wide unique message identifier: `"<chat_id>:<provider message id>"`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub String);

impl MessageId {
    /// Build the store-wide id from a chat id and the provider's per-chat message id.
    pub fn new(user_id: UserId, provider_message_id: i64) -> Self {
        Self(format!("{}:{}", user_id, provider_message_id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MessageId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

// =============================================================================
// Inbound updates
// =============================================================================

/// A single update from the provider's update stream.
///
/// Updates that carry no text message (joins, edits of unsupported kinds,
/// callback queries) still have an id and must still advance the cursor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Update {
    pub id: Offset,
    pub message: Option<InboundMessage>,
}

/// The message carried by an update.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Chat the message belongs to. Replies go back to this chat.
    pub user_id: UserId,
    /// Provider message id, unique within the chat.
    pub provider_message_id: i64,
    /// Message text. Empty for non-text messages.
    pub text: String,
    /// Provider timestamp of the message.
    pub timestamp: DateTime<Utc>,
    /// Sender's first name, if the provider supplied one.
    pub sender_name: Option<String>,
}

impl InboundMessage {
    pub fn message_id(&self) -> MessageId {
        MessageId::new(self.user_id, self.provider_message_id)
    }
}

// =============================================================================
// Stored records
// =============================================================================

/// A saved `(user_id, key) -> value` pair.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValueRecord {
    pub user_id: UserId,
    pub key: String,
    pub value: String,
    /// Epoch seconds of the last save.
    pub updated_at: i64,
}

/// An append-only stored message.
///
/// The only rewrite is a provider edit, which arrives with the same
/// `message_id` and replaces the text. The keyword index follows it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub message_id: MessageId,
    pub user_id: UserId,
    /// Epoch seconds; sort key within the user's partition.
    pub created_at: i64,
    /// Update that delivered the message. Breaks ties on `created_at`.
    pub update_id: Offset,
    pub text: String,
}

impl MessageRecord {
    /// Build the record stored for an inbound message.
    pub fn from_inbound(update_id: Offset, message: &InboundMessage) -> Self {
        Self {
            message_id: message.message_id(),
            user_id: message.user_id,
            created_at: message.timestamp.timestamp(),
            update_id,
            text: message.text.clone(),
        }
    }

    /// Creation time as a UTC datetime.
    pub fn created_at_utc(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.created_at, 0)
            .single()
            .unwrap_or_default()
    }

    pub fn composite_sort(&self) -> CompositeSort {
        CompositeSort::new(self.user_id, self.created_at)
    }
}

/// Ordering key for keyword index entries: user first, then time.
///
/// Keeps each user's hits for a keyword chronologically grouped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CompositeSort {
    pub user_id: UserId,
    pub created_at: i64,
}

impl CompositeSort {
    pub fn new(user_id: UserId, created_at: i64) -> Self {
        Self {
            user_id,
            created_at,
        }
    }
}

impl Ord for CompositeSort {
    fn cmp(&self, other: &Self) -> Ordering {
        self.user_id
            .cmp(&other.user_id)
            .then(self.created_at.cmp(&other.created_at))
    }
}

impl PartialOrd for CompositeSort {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for CompositeSort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{:020}", self.user_id, self.created_at)
    }
}

/// One `(keyword, composite_sort) -> message_id` entry of the inverted index.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordIndexEntry {
    pub keyword: String,
    pub sort: CompositeSort,
    pub message_id: MessageId,
    /// Leading slice of the message text, for result previews.
    pub snippet: String,
}

// =============================================================================
// Lookup scope
// =============================================================================

/// Whether message lookups (`getid`, `search`) see every user's messages
/// or only the requester's.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LookupScope {
    /// All users' messages are visible.
    #[default]
    Global,
    /// Only the requesting user's messages are visible.
    User,
}
