//! Answer providers for `/ask`.
//!
//! The bot does not answer questions itself. An [`AnswerProvider`] may be
//! configured; when none is, or it fails, the dispatcher replies with the
//! configured fallback text.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use memobot_core::config::AskConfig;

#[async_trait]
pub trait AnswerProvider: Send + Sync {
    /// An answer to `question`, or `None` if none is available.
    async fn ask(&self, question: &str) -> Option<String>;
}

/// Provider that never answers.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoAnswerProvider;

#[async_trait]
impl AnswerProvider for NoAnswerProvider {
    async fn ask(&self, _question: &str) -> Option<String> {
        None
    }
}

#[derive(Debug, Serialize)]
struct AskRequest<'a> {
    question: &'a str,
}

#[derive(Debug, Deserialize)]
struct AskResponse {
    #[serde(default)]
    answer: Option<String>,
}

/// Provider backed by an HTTP endpoint.
///
/// POSTs `{"question": ...}` and reads `{"answer": ...}` from the response.
#[derive(Debug, Clone)]
pub struct HttpAnswerProvider {
    endpoint: String,
    timeout: Duration,
    http: reqwest::Client,
}

impl HttpAnswerProvider {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Self {
        Self {
            endpoint: endpoint.into(),
            timeout,
            http: reqwest::Client::new(),
        }
    }

    async fn request(&self, question: &str) -> Result<Option<String>, reqwest::Error> {
        let response = self
            .http
            .post(self.endpoint.as_str())
            .timeout(self.timeout)
            .json(&AskRequest { question })
            .send()
            .await?
            .error_for_status()?;
        let body: AskResponse = response.json().await?;
        Ok(body.answer.filter(|a| !a.trim().is_empty()))
    }
}

#[async_trait]
impl AnswerProvider for HttpAnswerProvider {
    async fn ask(&self, question: &str) -> Option<String> {
        match self.request(question).await {
            Ok(answer) => answer,
            Err(e) => {
                warn!(endpoint = %self.endpoint, error = %e, "Answer provider request failed");
                None
            }
        }
    }
}

/// Build the provider described by the `[ask]` config section.
pub fn provider_from_config(config: &AskConfig) -> Box<dyn AnswerProvider> {
    match config.endpoint.as_deref().map(str::trim) {
        Some(endpoint) if !endpoint.is_empty() => Box::new(HttpAnswerProvider::new(
            endpoint,
            Duration::from_secs(config.timeout_secs),
        )),
        _ => Box::new(NoAnswerProvider),
    }
}
