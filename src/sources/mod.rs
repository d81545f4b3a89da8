//! Headline sources: structured feeds and scraped front pages.
//!
//! # Supported Kinds
//!
//! | Kind | Module | Method |
//! |------|--------|--------|
//! | Feed | [`feed`] | RSS / Atom / JSON Feed decoding via `feed-rs` |
//! | Html | [`html`] | CSS selector over the page via `scraper` |
//!
//! Each module exports a `fetch`/`scrape` function that never fails (errors
//! are logged and become an empty list) and a `try_` variant that surfaces
//! the error. [`collect`] runs a whole source list through the isolated task
//! runner and concatenates the results in list order.

pub mod feed;
pub mod html;

use itertools::Itertools;
use std::convert::Infallible;
use tracing::{info, instrument, warn};

use crate::http::PageFetch;
use crate::models::{ArticleStub, SourceDescriptor, SourceKind};
use crate::tasks::{TaskLimits, run_isolated};

/// Fetch or scrape one source according to its kind. Failures yield no stubs.
pub async fn fetch_source<F: PageFetch>(fetcher: &F, source: &SourceDescriptor) -> Vec<ArticleStub> {
    match source.kind {
        SourceKind::Feed => feed::fetch(fetcher, source).await,
        SourceKind::Html => html::scrape(fetcher, source).await,
    }
}

/// Retrieve every source with bounded concurrency.
///
/// Output is the concatenation of each source's stubs in the order the
/// sources were given; a failed or timed-out source contributes nothing.
#[instrument(level = "info", skip_all, fields(stage = stage, sources = sources.len()))]
pub async fn collect<F: PageFetch>(
    fetcher: &F,
    sources: &[SourceDescriptor],
    limits: TaskLimits,
    stage: &str,
) -> Vec<ArticleStub> {
    let results = run_isolated(sources, limits, |source| async move {
        Ok::<_, Infallible>(fetch_source(fetcher, source).await)
    })
    .await;

    let mut expired = 0usize;
    let stubs = results
        .into_iter()
        .zip(sources)
        .flat_map(|(result, source)| match result {
            Ok(stubs) => stubs,
            Err(e) => {
                expired += 1;
                warn!(source = %source.name, address = %source.address, error = %e, "Source abandoned; continuing without it");
                Vec::new()
            }
        })
        .collect_vec();

    info!(count = stubs.len(), expired, "Collected stubs");
    stubs
}
