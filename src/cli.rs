//! Command-line interface definitions for News Digest.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Secrets can be provided via environment variables instead of flags, and
//! every flag that has a config-file counterpart overrides it.

use clap::Parser;
use std::path::PathBuf;

use crate::config::AppConfig;
use crate::models::{RunMode, SourceMode};

/// Command-line arguments for the News Digest application.
///
/// # Examples
///
/// ```sh
/// # Enriched articles for the default category, built-in sources
/// news_digest
///
/// # A sports digest from the remotely configured source map
/// news_digest --category sports --mode digest --sources dynamic
///
/// # Keep a copy of the result on disk
/// news_digest -c config.yaml -j ./json
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to config.yaml file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Category to aggregate (overrides the config file)
    #[arg(long)]
    pub category: Option<String>,

    /// Return enriched articles or a single digest paragraph
    #[arg(long, value_enum, default_value_t = RunMode::Articles)]
    pub mode: RunMode,

    /// Use the built-in source map or the one posted to the configuration account
    #[arg(long, value_enum, default_value_t = SourceMode::Static)]
    pub sources: SourceMode,

    /// Maximum number of articles after filtering (overrides the config file)
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Output directory for a copy of the JSON result
    #[arg(short, long)]
    pub json_output_dir: Option<String>,

    /// API key for the generation service
    #[arg(long, env = "LLM_API_KEY", hide_env_values = true)]
    pub llm_api_key: Option<String>,

    /// Access token for the configuration account
    #[arg(long, env = "SOCIAL_ACCESS_TOKEN", hide_env_values = true)]
    pub social_token: Option<String>,
}

impl Cli {
    /// Layer the flags that were given over `config`.
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(category) = &self.category {
            config.category = category.clone();
        }
        if let Some(limit) = self.limit {
            config.limit = limit;
        }
        if let Some(key) = &self.llm_api_key {
            config.llm.api_key = Some(key.clone());
        }
        if let Some(token) = &self.social_token {
            config.dynamic.access_token = Some(token.clone());
        }
    }
}
