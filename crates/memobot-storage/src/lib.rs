//! Memobot Storage crate - SQLite persistence and the keyword index.
//!
//! Provides a WAL-mode SQLite database with migrations, one repository per
//! table (cursor, user key/values, messages, keyword index), the
//! [`BotStore`] contract the bot depends on, and keyword tokenization,
//! indexing and search.

pub mod db;
pub mod error;
pub mod index;
pub mod migrations;
pub mod repository;
pub mod search;
pub mod store;
pub mod tokenizer;

pub use db::Database;
pub use error::StoreError;
pub use index::{snippet, KeywordIndexer};
pub use repository::{
    CursorRepository, KeyValueRepository, KeywordIndexRepository, MessageRepository,
};
pub use search::KeywordSearch;
pub use store::{BotStore, SqliteStore};
pub use tokenizer::{Tokenizer, STOP_WORDS};
