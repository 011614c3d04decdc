//! The storage contract the bot core depends on.
//!
//! Any backend that can put/get/scan by partition key, append with a sort
//! key, and look up by a unique secondary key can implement [`BotStore`].
//! [`SqliteStore`] is the bundled implementation.

use std::sync::Arc;

use memobot_core::types::{
    KeyValueRecord, KeywordIndexEntry, MessageId, MessageRecord, Offset, UserId,
};

use crate::db::Database;
use crate::error::StoreError;
use crate::repository::{
    CursorRepository, KeyValueRepository, KeywordIndexRepository, MessageRepository,
};

/// Persistence operations used by the ingestion cycle and dispatcher.
///
/// Every write must tolerate being applied twice with the same arguments.
pub trait BotStore: Send + Sync {
    /// Last fully processed update id, `None` before the first cycle.
    fn read_cursor(&self) -> Result<Option<Offset>, StoreError>;

    /// Move the cursor forward. Returns the stored value, which is never
    /// lower than before the call.
    fn advance_cursor(&self, offset: Offset) -> Result<Offset, StoreError>;

    fn put_value(&self, record: &KeyValueRecord) -> Result<(), StoreError>;

    fn get_value(&self, user_id: UserId, key: &str) -> Result<Option<KeyValueRecord>, StoreError>;

    /// Keys saved by a user, in a stable order.
    fn list_keys(&self, user_id: UserId) -> Result<Vec<String>, StoreError>;

    fn append_message(&self, record: &MessageRecord) -> Result<(), StoreError>;

    /// Most recent messages for a user, newest first.
    fn recent_messages(&self, user_id: UserId, limit: u32)
        -> Result<Vec<MessageRecord>, StoreError>;

    fn find_message(&self, message_id: &MessageId) -> Result<Option<MessageRecord>, StoreError>;

    /// Make `entries` the complete set of index entries for `message_id`.
    fn replace_index_entries(
        &self,
        message_id: &MessageId,
        entries: &[KeywordIndexEntry],
    ) -> Result<(), StoreError>;

    /// Index entries for one keyword in composite-sort order.
    fn scan_keyword(
        &self,
        keyword: &str,
        user_id: Option<UserId>,
    ) -> Result<Vec<KeywordIndexEntry>, StoreError>;
}

/// [`BotStore`] backed by a single SQLite database.
pub struct SqliteStore {
    cursor: CursorRepository,
    values: KeyValueRepository,
    messages: MessageRepository,
    keywords: KeywordIndexRepository,
}

impl SqliteStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self {
            cursor: CursorRepository::new(Arc::clone(&db)),
            values: KeyValueRepository::new(Arc::clone(&db)),
            messages: MessageRepository::new(Arc::clone(&db)),
            keywords: KeywordIndexRepository::new(db),
        }
    }

    /// Store over a fresh in-memory database (for testing).
    pub fn in_memory() -> Result<Self, StoreError> {
        Ok(Self::new(Arc::new(Database::in_memory()?)))
    }

    pub fn message_count(&self) -> Result<u64, StoreError> {
        self.messages.count()
    }

    pub fn index_entry_count(&self) -> Result<u64, StoreError> {
        self.keywords.count()
    }

    pub fn keywords_for(&self, message_id: &MessageId) -> Result<Vec<String>, StoreError> {
        self.keywords.keywords_for(message_id)
    }
}

impl BotStore for SqliteStore {
    fn read_cursor(&self) -> Result<Option<Offset>, StoreError> {
        self.cursor.get()
    }

    fn advance_cursor(&self, offset: Offset) -> Result<Offset, StoreError> {
        self.cursor.advance(offset)
    }

    fn put_value(&self, record: &KeyValueRecord) -> Result<(), StoreError> {
        self.values.put(record)
    }

    fn get_value(&self, user_id: UserId, key: &str) -> Result<Option<KeyValueRecord>, StoreError> {
        self.values.get(user_id, key)
    }

    fn list_keys(&self, user_id: UserId) -> Result<Vec<String>, StoreError> {
        self.values.list_keys(user_id)
    }

    fn append_message(&self, record: &MessageRecord) -> Result<(), StoreError> {
        self.messages.append(record)
    }

    fn recent_messages(
        &self,
        user_id: UserId,
        limit: u32,
    ) -> Result<Vec<MessageRecord>, StoreError> {
        self.messages.recent(user_id, limit)
    }

    fn find_message(&self, message_id: &MessageId) -> Result<Option<MessageRecord>, StoreError> {
        self.messages.find_by_id(message_id)
    }

    fn replace_index_entries(
        &self,
        message_id: &MessageId,
        entries: &[KeywordIndexEntry],
    ) -> Result<(), StoreError> {
        self.keywords.replace_for(message_id, entries)
    }

    fn scan_keyword(
        &self,
        keyword: &str,
        user_id: Option<UserId>,
    ) -> Result<Vec<KeywordIndexEntry>, StoreError> {
        self.keywords.scan(keyword, user_id)
    }
}
