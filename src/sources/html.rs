//! Front-page scraping.
//!
//! A page is fetched, its configured CSS selector applied, and each matching
//! element's text becomes a headline. Every stub links to the scraped page
//! itself rather than to a per-headline article, since front-page markup
//! rarely ties the headline text to a stable anchor.

use scraper::{Html, Selector};
use tracing::{info, instrument, warn};

use crate::error::SourceFetchError;
use crate::http::PageFetch;
use crate::models::{ArticleStub, SourceDescriptor, SourceKind};
use crate::utils::collapse_whitespace;

/// Scrape one page. Failures are logged and yield no stubs.
#[instrument(level = "info", skip_all, fields(source = %source.name))]
pub async fn scrape<F: PageFetch>(fetcher: &F, source: &SourceDescriptor) -> Vec<ArticleStub> {
    match try_scrape(fetcher, source).await {
        Ok(stubs) => stubs,
        Err(e) => {
            warn!(address = %source.address, error = %e, "Scrape failed; skipping site");
            Vec::new()
        }
    }
}

/// Scrape one page, surfacing the failure.
pub async fn try_scrape<F: PageFetch>(
    fetcher: &F,
    source: &SourceDescriptor,
) -> Result<Vec<ArticleStub>, SourceFetchError> {
    let selector = match (source.kind, source.selector.as_deref()) {
        (SourceKind::Html, Some(selector)) => parse_selector(selector)?,
        (SourceKind::Html, None) => {
            return Err(SourceFetchError::Selector {
                selector: String::new(),
                reason: "html source without a selector".to_string(),
            });
        }
        (SourceKind::Feed, _) => {
            return Err(SourceFetchError::WrongKind {
                name: source.name.clone(),
                kind: "feed",
            });
        }
    };

    info!(address = %source.address, "Scraping page");
    let body = fetcher.fetch_text(&source.address).await?;
    let stubs = extract_headlines(&body, &selector, source);
    info!(count = stubs.len(), "Scraped headlines");
    Ok(stubs)
}

pub fn parse_selector(selector: &str) -> Result<Selector, SourceFetchError> {
    Selector::parse(selector).map_err(|e| SourceFetchError::Selector {
        selector: selector.to_string(),
        reason: e.to_string(),
    })
}

/// Apply `selector` to `body` and turn each non-empty match into a stub.
pub fn extract_headlines(body: &str, selector: &Selector, source: &SourceDescriptor) -> Vec<ArticleStub> {
    let document = Html::parse_document(body);
    document
        .select(selector)
        .filter_map(|element| {
            let text = collapse_whitespace(&element.text().collect::<String>());
            ArticleStub::new(&text, Some(source.address.clone()), source.name.clone(), None)
        })
        .collect()
}
