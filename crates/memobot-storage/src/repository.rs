//! Repository implementations for SQLite-backed persistence.
//!
//! One repository per table: the update cursor, key/value records, the
//! message log, and the keyword index. All writes use upsert or
//! insert-or-replace so that re-applying the same update is harmless.

use std::sync::Arc;

use chrono::Utc;
use rusqlite::OptionalExtension;

use memobot_core::types::{
    CompositeSort, KeyValueRecord, KeywordIndexEntry, MessageId, MessageRecord, Offset, UserId,
};

use crate::db::Database;
use crate::error::StoreError;

/// `bot_meta` key under which the update cursor is stored.
const CURSOR_KEY: &str = "update_offset";

/// Repository for the update cursor.
pub struct CursorRepository {
    db: Arc<Database>,
}

impl CursorRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Read the persisted cursor. `None` on first run.
    pub fn get(&self) -> Result<Option<Offset>, StoreError> {
        self.db.with_conn(|conn| {
            let offset = conn
                .query_row(
                    "SELECT value FROM bot_meta WHERE meta_key = ?1",
                    rusqlite::params![CURSOR_KEY],
                    |row| row.get::<_, i64>(0),
                )
                .optional()?;
            Ok(offset)
        })
    }

    /// Move the cursor forward to `offset`.
    ///
    /// The stored value becomes `max(stored, offset)`, so a slower
    /// overlapping run can never move it backwards. Returns the value
    /// stored after the write.
    pub fn advance(&self, offset: Offset) -> Result<Offset, StoreError> {
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO bot_meta (meta_key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(meta_key) DO UPDATE SET
                    value = MAX(bot_meta.value, excluded.value),
                    updated_at = excluded.updated_at",
                rusqlite::params![CURSOR_KEY, offset, Utc::now().timestamp()],
            )?;
            let stored = conn.query_row(
                "SELECT value FROM bot_meta WHERE meta_key = ?1",
                rusqlite::params![CURSOR_KEY],
                |row| row.get::<_, i64>(0),
            )?;
            Ok(stored)
        })
    }
}

/// Repository for per-user key/value records.
pub struct KeyValueRepository {
    db: Arc<Database>,
}

impl KeyValueRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Insert or overwrite a record.
    pub fn put(&self, record: &KeyValueRecord) -> Result<(), StoreError> {
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO user_data (user_id, item_key, value, updated_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(user_id, item_key) DO UPDATE SET
                    value = excluded.value,
                    updated_at = excluded.updated_at",
                rusqlite::params![record.user_id, record.key, record.value, record.updated_at],
            )?;
            Ok(())
        })
    }

    pub fn get(&self, user_id: UserId, key: &str) -> Result<Option<KeyValueRecord>, StoreError> {
        self.db.with_conn(|conn| {
            let record = conn
                .query_row(
                    "SELECT user_id, item_key, value, updated_at
                     FROM user_data WHERE user_id = ?1 AND item_key = ?2",
                    rusqlite::params![user_id, key],
                    row_to_key_value,
                )
                .optional()?;
            Ok(record)
        })
    }

    /// All keys saved by a user, sorted by key.
    pub fn list_keys(&self, user_id: UserId) -> Result<Vec<String>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT item_key FROM user_data WHERE user_id = ?1 ORDER BY item_key ASC",
            )?;
            let keys = stmt
                .query_map(rusqlite::params![user_id], |row| row.get::<_, String>(0))?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(keys)
        })
    }
}

/// Repository for the append-only message log.
pub struct MessageRepository {
    db: Arc<Database>,
}

impl MessageRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Append a message. Re-appending the same `message_id` replaces the row,
    /// which is how redelivered updates and provider edits land.
    pub fn append(&self, record: &MessageRecord) -> Result<(), StoreError> {
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT OR REPLACE INTO user_messages (message_id, user_id, created_at, update_id, text)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![
                    record.message_id.as_str(),
                    record.user_id,
                    record.created_at,
                    record.update_id,
                    record.text,
                ],
            )?;
            Ok(())
        })
    }

    /// The user's most recent messages, newest first.
    pub fn recent(&self, user_id: UserId, limit: u32) -> Result<Vec<MessageRecord>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT message_id, user_id, created_at, update_id, text
                 FROM user_messages
                 WHERE user_id = ?1
                 ORDER BY created_at DESC, update_id DESC
                 LIMIT ?2",
            )?;
            let records = stmt
                .query_map(rusqlite::params![user_id, limit], row_to_message)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(records)
        })
    }

    /// Point lookup by store-wide message id.
    pub fn find_by_id(&self, message_id: &MessageId) -> Result<Option<MessageRecord>, StoreError> {
        self.db.with_conn(|conn| {
            let record = conn
                .query_row(
                    "SELECT message_id, user_id, created_at, update_id, text
                     FROM user_messages WHERE message_id = ?1",
                    rusqlite::params![message_id.as_str()],
                    row_to_message,
                )
                .optional()?;
            Ok(record)
        })
    }

    pub fn count(&self) -> Result<u64, StoreError> {
        self.db.with_conn(|conn| {
            let count: i64 =
                conn.query_row("SELECT COUNT(*) FROM user_messages", [], |row| row.get(0))?;
            Ok(count as u64)
        })
    }
}

/// Repository for the inverted keyword index.
pub struct KeywordIndexRepository {
    db: Arc<Database>,
}

impl KeywordIndexRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Replace every entry of `message_id` with `entries` in one transaction.
    ///
    /// Keywords the message no longer contains are dropped, so an edited
    /// message is only found by its current text.
    pub fn replace_for(
        &self,
        message_id: &MessageId,
        entries: &[KeywordIndexEntry],
    ) -> Result<(), StoreError> {
        self.db.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            tx.execute(
                "DELETE FROM keyword_index WHERE message_id = ?1",
                rusqlite::params![message_id.as_str()],
            )?;
            {
                let mut stmt = tx.prepare(
                    "INSERT OR REPLACE INTO keyword_index
                        (keyword, message_id, user_id, created_at, user_created, snippet)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                )?;
                for entry in entries {
                    stmt.execute(rusqlite::params![
                        entry.keyword,
                        entry.message_id.as_str(),
                        entry.sort.user_id,
                        entry.sort.created_at,
                        entry.sort.to_string(),
                        entry.snippet,
                    ])?;
                }
            }
            tx.commit()?;
            Ok(())
        })
    }

    /// Entries for a keyword in composite-sort order, optionally limited to
    /// one user's partition.
    pub fn scan(
        &self,
        keyword: &str,
        user_id: Option<UserId>,
    ) -> Result<Vec<KeywordIndexEntry>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT keyword, message_id, user_id, created_at, snippet
                 FROM keyword_index
                 WHERE keyword = ?1 AND (?2 IS NULL OR user_id = ?2)
                 ORDER BY user_id ASC, created_at ASC, message_id ASC",
            )?;
            let entries = stmt
                .query_map(rusqlite::params![keyword, user_id], |row| {
                    Ok(KeywordIndexEntry {
                        keyword: row.get(0)?,
                        message_id: MessageId(row.get(1)?),
                        sort: CompositeSort::new(row.get(2)?, row.get(3)?),
                        snippet: row.get(4)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(entries)
        })
    }

    /// Distinct keywords indexed for a message.
    pub fn keywords_for(&self, message_id: &MessageId) -> Result<Vec<String>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT keyword FROM keyword_index WHERE message_id = ?1 ORDER BY keyword ASC",
            )?;
            let keywords = stmt
                .query_map(rusqlite::params![message_id.as_str()], |row| {
                    row.get::<_, String>(0)
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(keywords)
        })
    }

    pub fn count(&self) -> Result<u64, StoreError> {
        self.db.with_conn(|conn| {
            let count: i64 =
                conn.query_row("SELECT COUNT(*) FROM keyword_index", [], |row| row.get(0))?;
            Ok(count as u64)
        })
    }
}

// ============================================================================
// Helper functions for row-to-entity conversion.
// ============================================================================

fn row_to_key_value(row: &rusqlite::Row<'_>) -> rusqlite::Result<KeyValueRecord> {
    Ok(KeyValueRecord {
        user_id: row.get(0)?,
        key: row.get(1)?,
        value: row.get(2)?,
        updated_at: row.get(3)?,
    })
}

fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<MessageRecord> {
    Ok(MessageRecord {
        message_id: MessageId(row.get(0)?),
        user_id: row.get(1)?,
        created_at: row.get(2)?,
        update_id: row.get(3)?,
        text: row.get(4)?,
    })
}
