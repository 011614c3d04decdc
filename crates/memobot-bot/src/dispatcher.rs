//! Command dispatcher.
//!
//! Records inbound messages, runs the parsed command against the store, and
//! produces the reply text. User mistakes become reply text; only storage
//! failures are returned as errors.

use std::sync::Arc;

use tracing::debug;

use memobot_core::config::MemobotConfig;
use memobot_core::types::{
    InboundMessage, KeyValueRecord, LookupScope, MessageId, MessageRecord, Offset, UserId,
};
use memobot_storage::{BotStore, KeywordIndexer, KeywordSearch, StoreError};

use crate::answer::{AnswerProvider, NoAnswerProvider};
use crate::error::CommandError;
use crate::parser::{parse, Command};
use crate::response;
use crate::retry::RetryPolicy;

/// Dispatcher knobs taken from the config file.
#[derive(Debug, Clone)]
pub struct DispatchSettings {
    pub scope: LookupScope,
    pub max_results: usize,
    pub snippet_chars: usize,
    pub history_default: u32,
    pub history_max: u32,
    pub store_commands: bool,
    pub ask_fallback: String,
}

impl DispatchSettings {
    pub fn from_config(config: &MemobotConfig) -> Self {
        Self {
            scope: config.search.scope,
            max_results: config.search.max_results,
            snippet_chars: config.index.snippet_chars,
            history_default: config.history.default_limit,
            history_max: config.history.max_limit,
            store_commands: config.cycle.store_commands,
            ask_fallback: config.ask.fallback_reply.clone(),
        }
    }
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self::from_config(&MemobotConfig::default())
    }
}

pub struct Dispatcher {
    store: Arc<dyn BotStore>,
    indexer: KeywordIndexer,
    search: KeywordSearch,
    answers: Box<dyn AnswerProvider>,
    retry: RetryPolicy,
    settings: DispatchSettings,
}

impl Dispatcher {
    pub fn new(
        store: Arc<dyn BotStore>,
        answers: Box<dyn AnswerProvider>,
        config: &MemobotConfig,
    ) -> Self {
        Self {
            indexer: KeywordIndexer::new(Arc::clone(&store), &config.index),
            search: KeywordSearch::new(Arc::clone(&store), &config.index),
            store,
            answers,
            retry: RetryPolicy::from_config(&config.cycle),
            settings: DispatchSettings::from_config(config),
        }
    }

    /// Dispatcher with default config and no answer provider.
    pub fn with_defaults(store: Arc<dyn BotStore>) -> Self {
        Self::new(store, Box::new(NoAnswerProvider), &MemobotConfig::default())
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Handle one inbound message end to end. Returns the reply, if any.
    ///
    /// Every write is an overwrite keyed by deterministic ids, so the whole
    /// handler is retried on transient storage errors.
    pub async fn handle(
        &self,
        update_id: Offset,
        message: &InboundMessage,
    ) -> Result<Option<String>, StoreError> {
        self.retry
            .run("handle_message", || self.handle_once(update_id, message))
            .await
    }

    async fn handle_once(
        &self,
        update_id: Offset,
        message: &InboundMessage,
    ) -> Result<Option<String>, StoreError> {
        if message.text.trim().is_empty() {
            debug!(update_id, user_id = message.user_id, "Skipping message without text");
            return Ok(None);
        }

        let parsed = parse(&message.text);
        let is_command = parsed.as_ref().map_or(true, Command::is_command);
        if !is_command || self.settings.store_commands {
            self.record(update_id, message)?;
        }

        let reply = match parsed {
            Ok(command) => self.dispatch(message, &command).await?,
            Err(usage) => reject(message.user_id, CommandError::from(usage)),
        };
        Ok(Some(reply))
    }

    /// Append a message to the store and index its keywords.
    pub fn record(&self, update_id: Offset, message: &InboundMessage) -> Result<(), StoreError> {
        let record = MessageRecord::from_inbound(update_id, message);
        self.store.append_message(&record)?;
        self.indexer.index(
            &record.message_id,
            record.user_id,
            record.created_at,
            &record.text,
        )?;
        debug!(update_id, message_id = %record.message_id, "Message recorded");
        Ok(())
    }

    /// Run a parsed command and render its reply.
    pub async fn dispatch(
        &self,
        message: &InboundMessage,
        command: &Command,
    ) -> Result<String, StoreError> {
        let user_id = message.user_id;
        debug!(user_id, command = command.name(), "Dispatching command");

        let reply = match command {
            Command::Start => response::welcome(message.sender_name.as_deref()),
            Command::Hello => response::greeting(message.sender_name.as_deref()),
            Command::Help => response::HELP_TEXT.to_string(),
            Command::Echo { text } => text.clone(),
            Command::Save { key, value } => {
                self.store.put_value(&KeyValueRecord {
                    user_id,
                    key: key.clone(),
                    value: value.clone(),
                    updated_at: message.timestamp.timestamp(),
                })?;
                response::saved(key)
            }
            Command::Get { key } => match self.store.get_value(user_id, key)? {
                Some(record) => response::value(&record.key, &record.value),
                None => reject(user_id, CommandError::KeyNotFound(key.clone())),
            },
            Command::List => response::key_list(&self.store.list_keys(user_id)?),
            Command::History { limit } => {
                let limit = limit
                    .unwrap_or(self.settings.history_default)
                    .min(self.settings.history_max);
                let messages = self.store.recent_messages(user_id, limit)?;
                response::history(&messages, self.settings.snippet_chars)
            }
            Command::GetId { message_id } => match self.find_visible(user_id, message_id)? {
                Some(record) => response::message(&record),
                None => reject(user_id, CommandError::MessageNotFound(message_id.to_string())),
            },
            Command::Search { keyword } => {
                let results = self.search.search(
                    keyword,
                    self.scope_filter(user_id),
                    self.settings.max_results,
                )?;
                response::search_results(
                    keyword,
                    &results,
                    self.settings.scope == LookupScope::User,
                    self.settings.snippet_chars,
                )
            }
            Command::Ask { question } => self
                .answers
                .ask(question)
                .await
                .unwrap_or_else(|| self.settings.ask_fallback.clone()),
            Command::Unknown { name } => response::unknown_command(name),
            Command::Plain => response::PLAIN_REPLY.to_string(),
        };
        Ok(reply)
    }

    fn scope_filter(&self, user_id: UserId) -> Option<UserId> {
        match self.settings.scope {
            LookupScope::Global => None,
            LookupScope::User => Some(user_id),
        }
    }

    fn find_visible(
        &self,
        user_id: UserId,
        message_id: &MessageId,
    ) -> Result<Option<MessageRecord>, StoreError> {
        let found = self.store.find_message(message_id)?;
        Ok(match self.scope_filter(user_id) {
            Some(owner) => found.filter(|record| record.user_id == owner),
            None => found,
        })
    }
}

fn reject(user_id: UserId, err: CommandError) -> String {
    debug!(user_id, error = %err, "Command rejected");
    err.to_string()
}
