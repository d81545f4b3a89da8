//! Full-text enrichment of normalized stubs.
//!
//! Each stub's link is fetched and the text of its `<article>` element (or
//! the whole `<body>` when there is none) attached as `content`. The output
//! always has one record per input stub, in the same order: a failed fetch
//! degrades that record to [`FAILED_CONTENT`], a stub without a link gets
//! [`UNAVAILABLE_CONTENT`].

use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Node, Selector};
use tracing::{debug, info, instrument, warn};

use crate::error::EnrichmentError;
use crate::http::PageFetch;
use crate::models::{ArticleStub, EnrichedArticle, FAILED_CONTENT, UNAVAILABLE_CONTENT};
use crate::tasks::{TaskLimits, run_isolated};
use crate::utils::{collapse_whitespace, truncate_chars};

static ARTICLE: Lazy<Selector> = Lazy::new(|| Selector::parse("article").expect("static selector"));
static BODY: Lazy<Selector> = Lazy::new(|| Selector::parse("body").expect("static selector"));

/// Attach page text to every stub.
///
/// `max_chars` bounds the stored text per article.
#[instrument(level = "info", skip_all, fields(count = stubs.len()))]
pub async fn enrich<F: PageFetch>(
    fetcher: &F,
    stubs: Vec<ArticleStub>,
    limits: TaskLimits,
    max_chars: usize,
) -> Vec<EnrichedArticle> {
    let results = run_isolated(&stubs, limits, |stub| fetch_content(fetcher, stub, max_chars)).await;

    let enriched: Vec<EnrichedArticle> = stubs
        .into_iter()
        .zip(results)
        .map(|(stub, result)| match result {
            Ok(Some(content)) => EnrichedArticle::new(stub, content),
            Ok(None) => EnrichedArticle::new(stub, UNAVAILABLE_CONTENT),
            Err(e) => {
                warn!(title = %stub.title, source = %stub.source, error = %e, "Enrichment failed; keeping stub with sentinel content");
                EnrichedArticle::new(stub, FAILED_CONTENT)
            }
        })
        .collect();

    let with_content = enriched.iter().filter(|a| a.has_content()).count();
    info!(total = enriched.len(), with_content, "Enriched articles");
    enriched
}

/// Page text for one stub, or `None` when the stub has no link.
async fn fetch_content<F: PageFetch>(
    fetcher: &F,
    stub: &ArticleStub,
    max_chars: usize,
) -> Result<Option<String>, EnrichmentError> {
    let Some(link) = &stub.link else {
        return Ok(None);
    };
    let body = fetcher.fetch_text(link).await?;
    let text = extract_main_text(&body);
    debug!(%link, chars = text.chars().count(), "Extracted article text");
    Ok(Some(truncate_chars(&text, max_chars).to_string()))
}

/// Text of the first non-empty `<article>`, else of `<body>`.
pub fn extract_main_text(html: &str) -> String {
    let document = Html::parse_document(html);

    let article = document
        .select(&ARTICLE)
        .map(visible_text)
        .find(|text| !text.is_empty());
    if let Some(text) = article {
        return text;
    }

    document
        .select(&BODY)
        .next()
        .map(visible_text)
        .unwrap_or_default()
}

/// Concatenated text under `element`, skipping script and style contents.
fn visible_text(element: ElementRef<'_>) -> String {
    let mut out = String::new();
    for node in element.descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let hidden = node
            .parent()
            .and_then(|p| p.value().as_element())
            .is_some_and(|e| matches!(e.name(), "script" | "style" | "noscript" | "template"));
        if !hidden {
            out.push_str(text);
            out.push(' ');
        }
    }
    collapse_whitespace(&out)
}
