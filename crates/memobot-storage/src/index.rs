//! Keyword indexer.
//!
//! Turns a stored message into one [`KeywordIndexEntry`] per distinct token
//! and writes them through the [`BotStore`].

use std::sync::Arc;

use tracing::debug;

use memobot_core::config::IndexConfig;
use memobot_core::types::{CompositeSort, KeywordIndexEntry, MessageId, UserId};

use crate::error::StoreError;
use crate::store::BotStore;
use crate::tokenizer::Tokenizer;

/// Maintains the inverted keyword index.
pub struct KeywordIndexer {
    store: Arc<dyn BotStore>,
    tokenizer: Tokenizer,
    snippet_chars: usize,
}

impl KeywordIndexer {
    pub fn new(store: Arc<dyn BotStore>, config: &IndexConfig) -> Self {
        Self {
            store,
            tokenizer: Tokenizer::from_config(config),
            snippet_chars: config.snippet_chars,
        }
    }

    /// Build the entries for a message without writing them.
    pub fn entries_for(
        &self,
        message_id: &MessageId,
        user_id: UserId,
        created_at: i64,
        text: &str,
    ) -> Vec<KeywordIndexEntry> {
        let sort = CompositeSort::new(user_id, created_at);
        let snippet = snippet(text, self.snippet_chars);
        self.tokenizer
            .tokenize(text)
            .into_iter()
            .map(|keyword| KeywordIndexEntry {
                keyword,
                sort,
                message_id: message_id.clone(),
                snippet: snippet.clone(),
            })
            .collect()
    }

    /// Index a message. Returns the number of distinct keywords written.
    ///
    /// Replaces whatever was indexed for `message_id` before, so re-indexing
    /// an edited message drops the keywords it lost.
    pub fn index(
        &self,
        message_id: &MessageId,
        user_id: UserId,
        created_at: i64,
        text: &str,
    ) -> Result<usize, StoreError> {
        let entries = self.entries_for(message_id, user_id, created_at, text);
        self.store.replace_index_entries(message_id, &entries)?;
        debug!(message_id = %message_id, keywords = entries.len(), "Message indexed");
        Ok(entries.len())
    }
}

/// First `max_chars` characters of `text`.
pub fn snippet(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => text[..end].to_string(),
        None => text.to_string(),
    }
}
