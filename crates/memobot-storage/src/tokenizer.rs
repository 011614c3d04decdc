//! Keyword extraction for the inverted index.
//!
//! Lower-cases, splits on anything that is not a Unicode letter or digit,
//! drops short tokens (and optionally stop words), and keeps the first
//! occurrence of each token.

use std::collections::HashSet;

use memobot_core::config::IndexConfig;

/// Words dropped when `drop_stop_words` is enabled.
pub const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "and", "is", "in", "on", "at", "to", "for", "of", "with", "that", "this",
    "it", "as", "are", "was", "be", "by",
];

/// Splits message text into index keywords.
#[derive(Debug, Clone)]
pub struct Tokenizer {
    min_token_len: usize,
    drop_stop_words: bool,
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::from_config(&IndexConfig::default())
    }
}

impl Tokenizer {
    pub fn new(min_token_len: usize, drop_stop_words: bool) -> Self {
        Self {
            min_token_len: min_token_len.max(1),
            drop_stop_words,
        }
    }

    pub fn from_config(config: &IndexConfig) -> Self {
        Self::new(config.min_token_len, config.drop_stop_words)
    }

    pub fn min_token_len(&self) -> usize {
        self.min_token_len
    }

    /// Distinct keywords of `text` in first-seen order.
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let lowered = text.to_lowercase();
        let mut seen = HashSet::new();
        let mut tokens = Vec::new();

        for raw in lowered.split(|c: char| !c.is_alphanumeric()) {
            if raw.chars().count() < self.min_token_len {
                continue;
            }
            if self.drop_stop_words && STOP_WORDS.contains(&raw) {
                continue;
            }
            if seen.insert(raw) {
                tokens.push(raw.to_string());
            }
        }
        tokens
    }

    /// Normalize a search query to the single keyword it would be indexed
    /// under, or `None` if it would not be indexed as exactly one token.
    pub fn normalize_query(&self, query: &str) -> Option<String> {
        let mut tokens = self.tokenize(query);
        if tokens.len() == 1 {
            tokens.pop()
        } else {
            None
        }
    }
}
