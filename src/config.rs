//! Run configuration loaded from an optional YAML file.
//!
//! Every field has a default, so an empty file (or no file at all) yields a
//! working static-sources run. Command-line flags are layered on top in
//! [`crate::cli::Cli::apply`].
//!
//! ```yaml
//! category: sports
//! limit: 15
//! fetch:
//!   concurrency: 8
//!   run_deadline_secs: 90
//! llm:
//!   model: gpt-4o-mini
//!   target_words: 120
//! dynamic:
//!   instance: https://mastodon.social
//!   account_id: "109876543210"
//!   on_failure: static
//! ```

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;
use std::path::Path;
use std::time::Duration;
use tracing::{info, instrument};
use url::Url;

use crate::models::SourceDescriptor;
use crate::normalize::{DEFAULT_EXCLUDED_TITLES, DEFAULT_LIMIT};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Category of the source map to aggregate.
    pub category: String,
    /// Maximum number of stubs kept after normalization.
    pub limit: usize,
    /// Headlines that are navigation labels rather than articles.
    pub excluded_titles: Vec<String>,
    /// Front pages scraped on every run, in this order.
    pub scrape_targets: Vec<ScrapeTarget>,
    pub fetch: FetchSettings,
    pub llm: LlmSettings,
    pub dynamic: DynamicSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            category: "general".to_string(),
            limit: DEFAULT_LIMIT,
            excluded_titles: DEFAULT_EXCLUDED_TITLES
                .into_iter()
                .map(String::from)
                .collect(),
            scrape_targets: default_scrape_targets(),
            fetch: FetchSettings::default(),
            llm: LlmSettings::default(),
            dynamic: DynamicSettings::default(),
        }
    }
}

impl AppConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, serde_yaml::Error> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(yaml)
    }

    /// Load from `path`, or fall back to defaults when no path is given.
    #[instrument(level = "info", skip_all)]
    pub async fn load(path: Option<&Path>) -> Result<Self, Box<dyn Error>> {
        let Some(path) = path else {
            info!("No config file given; using defaults");
            return Ok(Self::default());
        };
        let yaml = tokio::fs::read_to_string(path).await?;
        let config = Self::from_yaml_str(&yaml)?;
        info!(path = %path.display(), category = %config.category, "Loaded configuration");
        Ok(config)
    }

    pub fn scrape_sources(&self) -> Vec<SourceDescriptor> {
        self.scrape_targets
            .iter()
            .map(|t| SourceDescriptor::html(t.name.clone(), t.address.clone(), t.selector.clone()))
            .collect()
    }
}

/// A front page and the selector that picks out its headlines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapeTarget {
    pub name: String,
    pub address: Url,
    pub selector: String,
}

fn default_scrape_targets() -> Vec<ScrapeTarget> {
    [
        ("BBC", "https://www.bbc.com/news", "h3"),
        ("NYTimes", "https://www.nytimes.com", "h2"),
        ("CNN", "https://edition.cnn.com", "span.cd__headline-text"),
    ]
    .into_iter()
    .filter_map(|(name, address, selector)| {
        Some(ScrapeTarget {
            name: name.to_string(),
            address: Url::parse(address).ok()?,
            selector: selector.to_string(),
        })
    })
    .collect()
}

/// Outbound request limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    pub user_agent: String,
    /// Per-request timeout.
    pub request_timeout_secs: u64,
    /// Simultaneous outbound requests per stage.
    pub concurrency: usize,
    /// Upper bound on the whole run; work still in flight is abandoned.
    pub run_deadline_secs: u64,
    /// Enriched article text is cut to this many characters.
    pub max_content_chars: usize,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            user_agent: concat!("news_digest/", env!("CARGO_PKG_VERSION")).to_string(),
            request_timeout_secs: 15,
            concurrency: 6,
            run_deadline_secs: 120,
            max_content_chars: 20_000,
        }
    }
}

impl FetchSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn run_deadline(&self) -> Duration {
        Duration::from_secs(self.run_deadline_secs)
    }
}

/// OpenAI-compatible generation service.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub api_base: String,
    pub model: String,
    pub api_key: Option<String>,
    /// Approximate length of the digest paragraph.
    pub target_words: usize,
    /// Retries after the first failed call. Zero means one attempt per run.
    pub max_retries: usize,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Per-call timeout. Generation is slow, so this is longer than `fetch.request_timeout_secs`.
    pub request_timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            api_base: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key: None,
            target_words: 150,
            max_retries: 0,
            temperature: 0.2,
            max_tokens: 600,
            request_timeout_secs: 60,
        }
    }
}

impl fmt::Debug for LlmSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmSettings")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("target_words", &self.target_words)
            .field("max_retries", &self.max_retries)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

impl LlmSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// What to do when the remote source map cannot be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FallbackPolicy {
    /// End the run with an empty result.
    #[default]
    Abort,
    /// Continue with the built-in source map.
    Static,
}

/// Social-post account whose latest post carries the source map.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DynamicSettings {
    pub instance: Option<Url>,
    /// Account to read. When absent, the account owning the token is used.
    pub account_id: Option<String>,
    pub access_token: Option<String>,
    pub on_failure: FallbackPolicy,
}

impl fmt::Debug for DynamicSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicSettings")
            .field("instance", &self.instance.as_ref().map(Url::as_str))
            .field("account_id", &self.account_id)
            .field("access_token", &self.access_token.as_ref().map(|_| "***"))
            .field("on_failure", &self.on_failure)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SourceKind;

    #[test]
    fn test_empty_yaml_is_default() {
        let config = AppConfig::from_yaml_str("").unwrap();
        assert_eq!(config.category, "general");
        assert_eq!(config.limit, 10);
        assert_eq!(config.excluded_titles, vec!["Videos", "Air Quality Index", "Opinion"]);
        assert_eq!(config.scrape_targets.len(), 3);
        assert_eq!(config.dynamic.on_failure, FallbackPolicy::Abort);
    }

    #[test]
    fn test_partial_yaml_keeps_other_defaults() {
        let yaml = r#"
category: sports
fetch:
  concurrency: 2
llm:
  target_words: 80
  request_timeout_secs: 30
dynamic:
  instance: https://mastodon.example
  on_failure: static
"#;
        let config = AppConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.category, "sports");
        assert_eq!(config.limit, 10);
        assert_eq!(config.fetch.concurrency, 2);
        assert_eq!(config.fetch.request_timeout_secs, 15);
        assert_eq!(config.llm.target_words, 80);
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert_eq!(config.llm.request_timeout(), Duration::from_secs(30));
        assert_eq!(LlmSettings::default().request_timeout(), Duration::from_secs(60));
        assert_eq!(config.dynamic.on_failure, FallbackPolicy::Static);
        assert_eq!(
            config.dynamic.instance.as_ref().map(Url::as_str),
            Some("https://mastodon.example/")
        );
    }

    #[test]
    fn test_scrape_targets_become_html_sources() {
        let config = AppConfig::default();
        let sources = config.scrape_sources();
        assert_eq!(sources[0].name, "BBC");
        assert_eq!(sources[2].selector.as_deref(), Some("span.cd__headline-text"));
        assert!(sources.iter().all(|s| s.kind == SourceKind::Html));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let mut config = AppConfig::default();
        config.llm.api_key = Some("sk-secret".to_string());
        config.dynamic.access_token = Some("token-secret".to_string());
        let dbg = format!("{config:?}");
        assert!(!dbg.contains("sk-secret"));
        assert!(!dbg.contains("token-secret"));
    }

    #[test]
    fn test_invalid_yaml_is_an_error() {
        assert!(AppConfig::from_yaml_str("limit: [not, a, number]").is_err());
    }
}
