use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{MemobotError, Result};
use crate::types::LookupScope;

/// Environment variable holding the Telegram bot token.
pub const ENV_BOT_TOKEN: &str = "BOT_TOKEN";
/// Environment variable overriding `general.data_dir`.
pub const ENV_DATA_DIR: &str = "MEMOBOT_DATA_DIR";

/// Top-level configuration for Memobot.
///
/// Loaded from `~/.memobot/config.toml` by default. Each section corresponds
/// to one component of the bot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemobotConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub cycle: CycleConfig,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub ask: AskConfig,
}

impl MemobotConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: MemobotConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, or defaults if there is no file.
    ///
    /// A file that exists but cannot be read or parsed is still an error.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Apply environment overrides from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides using `lookup` as the environment.
    ///
    /// Empty values are ignored.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = lookup(ENV_BOT_TOKEN).filter(|v| !v.trim().is_empty()) {
            self.telegram.bot_token = token;
        }
        if let Some(dir) = lookup(ENV_DATA_DIR).filter(|v| !v.trim().is_empty()) {
            self.general.data_dir = dir;
        }
    }

    /// Check that the configuration can drive an ingestion cycle.
    ///
    /// A failure here is fatal: nothing should be fetched or persisted.
    /// Telegram settings are only required while the cycle is enabled.
    pub fn validate(&self) -> Result<()> {
        if self.cycle.enabled && self.telegram.bot_token.trim().is_empty() {
            return Err(MemobotError::Config(format!(
                "telegram.bot_token is empty (set it in the config file or via {})",
                ENV_BOT_TOKEN
            )));
        }
        if self.cycle.enabled && self.telegram.api_base.trim().is_empty() {
            return Err(MemobotError::Config(
                "telegram.api_base must not be empty".to_string(),
            ));
        }
        if self.index.min_token_len == 0 {
            return Err(MemobotError::Config(
                "index.min_token_len must be at least 1".to_string(),
            ));
        }
        if self.search.max_results == 0 {
            return Err(MemobotError::Config(
                "search.max_results must be at least 1".to_string(),
            ));
        }
        if self.history.default_limit == 0 || self.history.default_limit > self.history.max_limit
        {
            return Err(MemobotError::Config(format!(
                "history.default_limit ({}) must be between 1 and history.max_limit ({})",
                self.history.default_limit, self.history.max_limit
            )));
        }
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Data directory holding the SQLite database.
    pub data_dir: String,
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: "~/.memobot/data".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Telegram Bot API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    /// Base URL of the Bot API, without the `/bot<token>` suffix.
    pub api_base: String,
    /// Bot token. Usually supplied through `BOT_TOKEN` instead of the file.
    pub bot_token: String,
    /// Long-poll timeout passed to `getUpdates`, in seconds.
    pub poll_timeout_secs: u64,
    /// HTTP request timeout, in seconds. Must exceed the poll timeout.
    pub request_timeout_secs: u64,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.telegram.org".to_string(),
            bot_token: String::new(),
            poll_timeout_secs: 5,
            request_timeout_secs: 10,
        }
    }
}

/// Ingestion cycle settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CycleConfig {
    /// When false, a cycle returns immediately without touching the cursor.
    pub enabled: bool,
    /// Wall-clock budget for one cycle. Updates not started in time are
    /// left for the next cycle.
    pub time_budget_secs: u64,
    /// Retries for a transient store error on the update in flight.
    pub store_retries: u32,
    /// Base delay of the exponential retry backoff, in milliseconds.
    pub retry_base_delay_ms: u64,
    /// Also store and index command messages, not only plain messages.
    pub store_commands: bool,
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            time_budget_secs: 50,
            store_retries: 3,
            retry_base_delay_ms: 50,
            store_commands: false,
        }
    }
}

/// Keyword tokenizer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Tokens shorter than this many characters are not indexed.
    pub min_token_len: usize,
    /// Drop common English stop words.
    pub drop_stop_words: bool,
    /// Characters of message text kept as the index snippet.
    pub snippet_chars: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            min_token_len: 3,
            drop_stop_words: false,
            snippet_chars: 200,
        }
    }
}

/// Search settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Visibility of `getid` and `search` results.
    pub scope: LookupScope,
    /// Maximum results listed in a search reply.
    pub max_results: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            scope: LookupScope::Global,
            max_results: 10,
        }
    }
}

/// `/history` settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Messages returned when no count is given.
    pub default_limit: u32,
    /// Upper bound on the requested count.
    pub max_limit: u32,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            default_limit: 5,
            max_limit: 50,
        }
    }
}

/// `/ask` answer provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AskConfig {
    /// HTTP endpoint answering `{"question": ...}` with `{"answer": ...}`.
    /// No endpoint means every question gets the fallback reply.
    pub endpoint: Option<String>,
    /// Request timeout, in seconds.
    pub timeout_secs: u64,
    /// Reply used when no answer is available.
    pub fallback_reply: String,
}

impl Default for AskConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout_secs: 8,
            fallback_reply: "I can't answer questions right now. Try /search instead."
                .to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    fn valid_config() -> MemobotConfig {
        let mut config = MemobotConfig::default();
        config.telegram.bot_token = "123:abc".to_string();
        config
    }

    #[test]
    fn test_default_config() {
        let config = MemobotConfig::default();
        assert_eq!(config.general.data_dir, "~/.memobot/data");
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.telegram.api_base, "https://api.telegram.org");
        assert!(config.telegram.bot_token.is_empty());
        assert_eq!(config.telegram.poll_timeout_secs, 5);
        assert!(config.cycle.enabled);
        assert_eq!(config.cycle.store_retries, 3);
        assert!(!config.cycle.store_commands);
        assert_eq!(config.index.min_token_len, 3);
        assert!(!config.index.drop_stop_words);
        assert_eq!(config.search.scope, LookupScope::Global);
        assert_eq!(config.search.max_results, 10);
        assert_eq!(config.history.default_limit, 5);
        assert_eq!(config.history.max_limit, 50);
        assert!(config.ask.endpoint.is_none());
    }

    #[test]
    fn test_load_partial_config_uses_defaults() {
        let content = r#"
[general]
log_level = "debug"

[search]
scope = "user"

[index]
min_token_len = 2
drop_stop_words = true
"#;
        let file = create_temp_config(content);
        let config = MemobotConfig::load(file.path()).unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.search.scope, LookupScope::User);
        assert_eq!(config.search.max_results, 10);
        assert_eq!(config.index.min_token_len, 2);
        assert!(config.index.drop_stop_words);
        assert_eq!(config.history.default_limit, 5);
    }

    #[test]
    fn test_load_invalid_toml() {
        let file = create_temp_config("this is {{ not valid TOML");
        let result = MemobotConfig::load(file.path());
        assert!(matches!(result, Err(MemobotError::Config(_))));
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = MemobotConfig::load_or_default(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.general.data_dir, "~/.memobot/data");
    }

    #[test]
    fn test_load_or_default_reads_existing_file() {
        let file = create_temp_config("[search]\nscope = \"user\"\n");
        let config = MemobotConfig::load_or_default(file.path()).unwrap();
        assert_eq!(config.search.scope, LookupScope::User);
    }

    #[test]
    fn test_load_or_default_rejects_malformed_file() {
        let file = create_temp_config("this is {{ not valid TOML");
        assert!(matches!(
            MemobotConfig::load_or_default(file.path()),
            Err(MemobotError::Config(_))
        ));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> =
            HashMap::from([(ENV_BOT_TOKEN, "999:zzz"), (ENV_DATA_DIR, "/srv/memobot")]);
        let mut config = MemobotConfig::default();
        config.apply_overrides_from(|key| env.get(key).map(|v| v.to_string()));
        assert_eq!(config.telegram.bot_token, "999:zzz");
        assert_eq!(config.general.data_dir, "/srv/memobot");
    }

    #[test]
    fn test_empty_env_values_are_ignored() {
        let mut config = valid_config();
        config.apply_overrides_from(|_| Some("  ".to_string()));
        assert_eq!(config.telegram.bot_token, "123:abc");
        assert_eq!(config.general.data_dir, "~/.memobot/data");
    }

    #[test]
    fn test_validate_requires_token() {
        let config = MemobotConfig::default();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, MemobotError::Config(_)));
        assert!(err.to_string().contains("bot_token"));

        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_validate_disabled_cycle_needs_no_token() {
        let mut config = MemobotConfig::default();
        config.cycle.enabled = false;
        assert!(config.validate().is_ok());

        config.history.default_limit = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_limits() {
        let mut config = valid_config();
        config.history.default_limit = 60;
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.index.min_token_len = 0;
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.search.max_results = 0;
        assert!(config.validate().is_err());
    }
}
