//! Keyword search over the inverted index.
//!
//! Exact, case-insensitive, single-token matching. Hits are resolved back
//! to stored messages and returned in composite-sort order (user, then
//! creation time).

use std::sync::Arc;

use tracing::warn;

use memobot_core::config::IndexConfig;
use memobot_core::types::{MessageRecord, UserId};

use crate::error::StoreError;
use crate::store::BotStore;
use crate::tokenizer::Tokenizer;

/// Keyword search engine.
pub struct KeywordSearch {
    store: Arc<dyn BotStore>,
    tokenizer: Tokenizer,
}

impl KeywordSearch {
    pub fn new(store: Arc<dyn BotStore>, config: &IndexConfig) -> Self {
        Self {
            store,
            tokenizer: Tokenizer::from_config(config),
        }
    }

    /// Up to `limit` messages containing `keyword`, ordered by
    /// `(user_id, created_at)`.
    ///
    /// `user_id` restricts results to one user's messages. A keyword that
    /// would not be indexed as a single token matches nothing.
    pub fn search(
        &self,
        keyword: &str,
        user_id: Option<UserId>,
        limit: usize,
    ) -> Result<Vec<MessageRecord>, StoreError> {
        let Some(token) = self.tokenizer.normalize_query(keyword) else {
            return Ok(Vec::new());
        };

        let entries = self.store.scan_keyword(&token, user_id)?;
        let mut results = Vec::with_capacity(entries.len().min(limit));
        for entry in entries {
            if results.len() >= limit {
                break;
            }
            match self.store.find_message(&entry.message_id)? {
                Some(record) => results.push(record),
                None => {
                    warn!(
                        keyword = %token,
                        message_id = %entry.message_id,
                        "Index entry points at a missing message"
                    );
                }
            }
        }
        Ok(results)
    }
}
