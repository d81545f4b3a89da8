//! Text-generation API interaction with optional exponential backoff.
//!
//! This module provides the interface to an OpenAI-compatible
//! chat-completions endpoint used to write the digest.
//!
//! # Architecture
//!
//! The module uses a trait-based design for flexibility:
//! - [`AskAsync`]: Core trait defining async LLM interaction
//! - [`ChatClient`]: Sends one prompt to `{api_base}/chat/completions`
//! - [`RetryAsk`]: Decorator that adds retry logic to any `AskAsync` implementation
//!
//! # Retry Strategy
//!
//! A run makes a single attempt by default (`max_retries = 0`). When retries
//! are configured:
//! - Exponential backoff starting at the base delay
//! - Maximum delay capped at 30 seconds
//! - Random jitter (0-250ms) added to prevent thundering herd

use rand::{Rng, rng};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration as StdDuration, Instant};
use tokio::time::sleep;
use tracing::{error, info, instrument, warn};

use crate::config::LlmSettings;
use crate::error::SummarizationError;
use crate::utils::truncate_for_log;

/// Trait for async LLM interaction.
///
/// Implementors of this trait can send text to an LLM and receive a response.
/// This abstraction allows for different LLM backends or decorators (like retry logic).
pub trait AskAsync {
    /// Send text to the LLM and receive its reply.
    async fn ask(&self, text: &str) -> Result<String, SummarizationError>;
}

/// Wrapper that adds exponential backoff retry logic to any [`AskAsync`] implementation.
///
/// The delay between retries follows this formula:
/// ```text
/// delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
/// ```
pub struct RetryAsk<T> {
    /// The underlying LLM client to wrap.
    inner: T,
    /// Maximum number of retry attempts before giving up.
    max_retries: usize,
    /// Initial delay between retries (doubles with each attempt).
    base_delay: StdDuration,
    /// Maximum delay cap to prevent excessive waiting.
    max_delay: StdDuration,
}

impl<T> RetryAsk<T>
where
    T: AskAsync,
{
    /// Create a new retry wrapper around an existing [`AskAsync`] implementation.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let client = ChatClient::new(&settings)?;
    /// let retry_client = RetryAsk::new(client, 2, Duration::from_secs(1));
    /// ```
    pub fn new(inner: T, max_retries: usize, base_delay: StdDuration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: StdDuration::from_secs(30),
        }
    }
}

impl<T> fmt::Debug for RetryAsk<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryAsk")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T> AskAsync for RetryAsk<T>
where
    T: AskAsync,
{
    #[instrument(level = "info", skip_all)]
    async fn ask(&self, text: &str) -> Result<String, SummarizationError> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            let attempt_t0 = Instant::now();
            match self.inner.ask(text).await {
                Ok(resp) => {
                    return Ok(resp);
                }
                Err(SummarizationError::MissingApiKey) => {
                    return Err(SummarizationError::MissingApiKey);
                }
                Err(e) => {
                    attempt += 1;
                    let attempt_dt = attempt_t0.elapsed();
                    let total_dt = total_t0.elapsed();

                    if attempt > self.max_retries {
                        error!(
                            attempt,
                            max = self.max_retries,
                            elapsed_ms_attempt = attempt_dt.as_millis(),
                            elapsed_ms_total = total_dt.as_millis(),
                            error = %e,
                            "ask() exhausted retries"
                        );
                        return Err(e);
                    }

                    // backoff calc
                    let mut delay = self.base_delay.saturating_mul(1 << (attempt - 1).min(16));
                    if delay > self.max_delay {
                        delay = self.max_delay;
                    }
                    let jitter_ms: u64 = rng().random_range(0..=250);
                    let delay = delay + StdDuration::from_millis(jitter_ms);

                    warn!(
                        attempt,
                        max = self.max_retries,
                        elapsed_ms_attempt = attempt_dt.as_millis(),
                        elapsed_ms_total = total_dt.as_millis(),
                        ?delay,
                        error = %e,
                        "ask() attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

const SYSTEM_PROMPT: &str = "You are a news editor. You write neutral, factual summaries of news \
coverage for busy readers. Output only the summary paragraph, with no heading, list or preamble.";

/// Client for an OpenAI-compatible `chat/completions` endpoint.
pub struct ChatClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
    temperature: f32,
    max_tokens: u32,
    timeout: StdDuration,
}

impl ChatClient {
    /// Build a client whose calls time out after `settings.request_timeout()`.
    pub fn new(settings: &LlmSettings) -> Result<Self, reqwest::Error> {
        let timeout = settings.request_timeout();
        let http = reqwest::Client::builder()
            .user_agent(concat!("news_digest/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;
        Ok(Self {
            http,
            endpoint: format!("{}/chat/completions", settings.api_base.trim_end_matches('/')),
            api_key: settings.api_key.clone().filter(|k| !k.trim().is_empty()),
            model: settings.model.clone(),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
            timeout,
        })
    }
}

impl fmt::Debug for ChatClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatClient")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl ChatClient {
    fn request_body<'a>(&'a self, text: &'a str) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages: vec![
                Message {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                Message {
                    role: "user",
                    content: text,
                },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }
}

impl AskAsync for ChatClient {
    #[instrument(level = "info", skip_all, fields(model = %self.model))]
    async fn ask(&self, text: &str) -> Result<String, SummarizationError> {
        let api_key = self.api_key.as_deref().ok_or(SummarizationError::MissingApiKey)?;
        let t0 = Instant::now();

        let resp = self
            .http
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&self.request_body(text))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!(elapsed_ms = t0.elapsed().as_millis(), status = status.as_u16(), "API call failed");
            return Err(SummarizationError::Status {
                status: status.as_u16(),
                body: truncate_for_log(&body, 300),
            });
        }

        let body: ChatResponse = resp.json().await?;
        let content = extract_reply(body)?;
        info!(elapsed_ms = t0.elapsed().as_millis(), chars = content.len(), "API call succeeded");
        Ok(content)
    }
}

fn extract_reply(body: ChatResponse) -> Result<String, SummarizationError> {
    body.choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .ok_or(SummarizationError::EmptyResponse)
}

/// Build the configured client: a [`ChatClient`] wrapped in [`RetryAsk`].
pub fn build_client(settings: &LlmSettings) -> Result<RetryAsk<ChatClient>, reqwest::Error> {
    let client = ChatClient::new(settings)?;
    Ok(RetryAsk::new(client, settings.max_retries, StdDuration::from_secs(1)))
}


#[cfg(test)]
mod tests {
    use super::testing::ScriptedAsk;
    use super::*;

    #[tokio::test]
    async fn test_single_attempt_by_default() {
        let api = RetryAsk::new(
            ScriptedAsk::new(vec![Err(SummarizationError::EmptyResponse), Ok("late".into())]),
            0,
            StdDuration::from_millis(1),
        );
        assert!(api.ask("prompt").await.is_err());
        assert_eq!(api.inner.calls(), 1);
    }

    #[tokio::test]
    async fn test_retries_until_success() {
        let api = RetryAsk::new(
            ScriptedAsk::new(vec![Err(SummarizationError::EmptyResponse), Ok("digest".into())]),
            2,
            StdDuration::from_millis(1),
        );
        assert_eq!(api.ask("prompt").await.unwrap(), "digest");
        assert_eq!(api.inner.calls(), 2);
    }

    #[tokio::test]
    async fn test_missing_key_is_not_retried() {
        let api = RetryAsk::new(
            ScriptedAsk::new(vec![Err(SummarizationError::MissingApiKey)]),
            3,
            StdDuration::from_millis(1),
        );
        assert!(matches!(api.ask("prompt").await, Err(SummarizationError::MissingApiKey)));
        assert_eq!(api.inner.calls(), 1);
    }

    #[tokio::test]
    async fn test_chat_client_without_key_fails_fast() {
        let client = ChatClient::new(&LlmSettings::default()).unwrap();
        assert!(matches!(client.ask("hi").await, Err(SummarizationError::MissingApiKey)));
    }

    #[test]
    fn test_request_body_shape() {
        let settings = LlmSettings {
            api_base: "https://llm.example/v1/".to_string(),
            api_key: Some("k".to_string()),
            ..LlmSettings::default()
        };
        let client = ChatClient::new(&settings).unwrap();
        assert_eq!(client.endpoint, "https://llm.example/v1/chat/completions");
        assert_eq!(client.timeout, StdDuration::from_secs(60));

        let json = serde_json::to_value(client.request_body("articles")).unwrap();
        assert_eq!(json["model"], "gpt-4o-mini");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "articles");
    }

    #[test]
    fn test_extract_reply() {
        let body: ChatResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"role":"assistant","content":"  A digest. "}}]}"#).unwrap();
        assert_eq!(extract_reply(body).unwrap(), "A digest.");

        let empty: ChatResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(matches!(extract_reply(empty), Err(SummarizationError::EmptyResponse)));

        let null: ChatResponse = serde_json::from_str(r#"{"choices":[{"message":{"content":null}}]}"#).unwrap();
        assert!(matches!(extract_reply(null), Err(SummarizationError::EmptyResponse)));
    }
}
