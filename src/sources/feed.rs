//! Structured feed sources (RSS, Atom, JSON Feed).
//!
//! The document is decoded by `feed-rs`; each entry becomes one
//! [`ArticleStub`] in document order. Entries without a usable title are
//! dropped here and never reach the normalizer.

use feed_rs::model::{Entry, Link};
use tracing::{info, instrument, warn};

use crate::error::SourceFetchError;
use crate::http::PageFetch;
use crate::models::{ArticleStub, NO_DESCRIPTION, SourceDescriptor, SourceKind};
use crate::utils::fragment_text;

/// Fetch one feed source. Failures are logged and yield no stubs.
#[instrument(level = "info", skip_all, fields(source = %source.name))]
pub async fn fetch<F: PageFetch>(fetcher: &F, source: &SourceDescriptor) -> Vec<ArticleStub> {
    match try_fetch(fetcher, source).await {
        Ok(stubs) => stubs,
        Err(e) => {
            warn!(address = %source.address, error = %e, "Feed fetch failed; skipping source");
            Vec::new()
        }
    }
}

/// Fetch and decode one feed source, surfacing the failure.
pub async fn try_fetch<F: PageFetch>(
    fetcher: &F,
    source: &SourceDescriptor,
) -> Result<Vec<ArticleStub>, SourceFetchError> {
    if source.kind != SourceKind::Feed {
        return Err(SourceFetchError::WrongKind {
            name: source.name.clone(),
            kind: "html",
        });
    }

    info!(address = %source.address, "Fetching feed");
    let body = fetcher.fetch_bytes(&source.address).await?;
    let stubs = parse_feed(&body, source)?;
    info!(count = stubs.len(), "Fetched feed entries");
    Ok(stubs)
}

/// Decode a feed document into stubs attributed to `source`.
pub fn parse_feed(body: &[u8], source: &SourceDescriptor) -> Result<Vec<ArticleStub>, SourceFetchError> {
    let feed = feed_rs::parser::parse(body).map_err(|e| SourceFetchError::Decode {
        url: source.address.to_string(),
        reason: e.to_string(),
    })?;

    let source_name = feed
        .title
        .map(|t| t.content.trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| source.name.clone());

    Ok(feed
        .entries
        .into_iter()
        .filter_map(|entry| entry_to_stub(entry, source, &source_name))
        .collect())
}

fn entry_to_stub(entry: Entry, source: &SourceDescriptor, source_name: &str) -> Option<ArticleStub> {
    let title = entry.title.map(|t| t.content).unwrap_or_default();
    // Relative links resolve against the feed address.
    let link = article_link(&entry.links).and_then(|l| source.address.join(&l.href).ok());

    let description = entry
        .summary
        .map(|s| fragment_text(&s.content))
        .filter(|s| !s.is_empty())
        .or_else(|| {
            entry
                .content
                .and_then(|c| c.body)
                .map(|b| fragment_text(&b))
                .filter(|b| !b.is_empty())
        })
        .unwrap_or_else(|| NO_DESCRIPTION.to_string());

    ArticleStub::new(&title, link, source_name, Some(description))
}

/// The entry's page: the first `alternate` (or untyped) link, else the first link.
fn article_link(links: &[Link]) -> Option<&Link> {
    links
        .iter()
        .find(|l| matches!(l.rel.as_deref(), None | Some("alternate")))
        .or_else(|| links.first())
}
