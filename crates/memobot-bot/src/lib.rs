//! Memobot Bot crate - command handling and the ingestion cycle.
//!
//! Parses chat commands, dispatches them against the [`BotStore`], and runs
//! the cursor-driven ingestion cycle that fetches updates from Telegram,
//! handles them in order, and replies.
//!
//! [`BotStore`]: memobot_storage::BotStore

pub mod answer;
pub mod dispatcher;
pub mod error;
pub mod fetcher;
pub mod ingest;
pub mod parser;
pub mod response;
pub mod retry;
pub mod telegram;

pub use answer::{provider_from_config, AnswerProvider, HttpAnswerProvider, NoAnswerProvider};
pub use dispatcher::{DispatchSettings, Dispatcher};
pub use error::{BotError, CommandError, FetchError, UsageError};
pub use fetcher::{NullReplySender, ReplySender, UpdateFetcher};
pub use ingest::{
    process_batch, BatchResult, CycleOutcome, CyclePhase, CycleStatus, IngestCycle, Reply,
    StopReason,
};
pub use parser::{parse, Command};
pub use retry::RetryPolicy;
pub use telegram::TelegramClient;
