//! # News Digest
//!
//! A news aggregation pipeline that collects headlines from feeds and
//! scraped front pages, attaches the full text of each article, and
//! optionally condenses the result into a single digest paragraph through an
//! OpenAI-compatible LLM API.
//!
//! ## Features
//!
//! - Built-in source map (`general`, `sports`, `business`, `technology`) or a
//!   map posted as JSON to a Mastodon-compatible account
//! - RSS, Atom and JSON Feed decoding plus CSS-selector scraping
//! - Bounded concurrency, per-request timeouts and a run deadline
//! - Every failure below the run is isolated and logged; a run always
//!   produces a result
//!
//! ## Usage
//!
//! ```sh
//! news_digest --category technology --mode digest -j ./json
//! ```
//!
//! ## Architecture
//!
//! The application follows a pipeline architecture:
//! 1. **Resolving**: Pick the category's sources (static or dynamic)
//! 2. **Fetching**: Decode feeds and scrape front pages concurrently
//! 3. **Normalizing**: Merge, drop navigation labels, cap the count
//! 4. **Enriching**: Download each article's text
//! 5. **Summarizing**: One digest paragraph (digest mode only)
//!
//! The result is printed to stdout as JSON; logs go to stderr.

use clap::Parser;
use std::error::Error;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod api;
mod cli;
mod config;
mod enrich;
mod error;
mod http;
mod models;
mod normalize;
mod outputs;
mod pipeline;
mod registry;
mod sources;
mod summarize;
mod tasks;
mod utils;

use cli::Cli;
use config::AppConfig;
use http::HttpFetcher;
use models::SourceMode;
use outputs::json::{Edition, write_edition};
use pipeline::Pipeline;
use registry::MastodonProvider;
use utils::ensure_writable_dir;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("news_digest starting up");

    // Parse CLI
    let args = Cli::parse();
    debug!(?args.config, ?args.mode, ?args.sources, "Parsed CLI arguments");

    let mut config = AppConfig::load(args.config.as_deref()).await?;
    args.apply(&mut config);
    debug!(?config, "Effective configuration");

    // Early check: ensure JSON output dir is writable
    if let Some(dir) = &args.json_output_dir {
        if let Err(e) = ensure_writable_dir(dir).await {
            error!(
                path = %dir,
                error = %e,
                "JSON output directory is not writable (fix perms or choose a different path)"
            );
            return Err(e);
        }
    }

    let fetcher = HttpFetcher::new(&config.fetch)?;
    let provider = match MastodonProvider::from_config(&config.dynamic, fetcher.client().clone()) {
        Ok(provider) => Some(provider),
        Err(e) if args.sources == SourceMode::Dynamic => {
            warn!(error = %e, "Dynamic sources requested but no configuration account is set up");
            None
        }
        Err(e) => {
            debug!(error = %e, "No configuration account available");
            None
        }
    };
    let ask = api::build_client(&config.llm)?;

    let pipeline = Pipeline {
        config: &config,
        fetcher: &fetcher,
        provider: provider.as_ref(),
        ask: &ask,
    };
    let outcome = pipeline.run(args.mode, args.sources).await;

    println!("{}", serde_json::to_string_pretty(&outcome.output)?);

    if let Some(dir) = &args.json_output_dir {
        let edition = Edition::now(&config.category, &outcome.output);
        if let Err(e) = write_edition(&edition, dir).await {
            error!(error = %e, "Failed to write JSON edition");
        }
    }

    if outcome.output.is_empty() {
        warn!(state = %outcome.state, "Run produced an empty result");
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        state = %outcome.state,
        "Execution complete"
    );

    Ok(())
}
