//! Digest synthesis over the enriched articles.
//!
//! One prompt, one paragraph. Every failure ends as `None`; the reason is
//! only logged.

use itertools::Itertools;
use tokio::time::{Instant, timeout_at};
use tracing::{error, info, instrument};

use crate::api::AskAsync;
use crate::error::SummarizationError;
use crate::models::EnrichedArticle;
use crate::utils::truncate_chars;

/// Characters of article text included per article.
const PROMPT_CONTENT_CHARS: usize = 1_500;

/// Build the prompt asking for a single paragraph of about `target_words` words.
pub fn build_prompt(articles: &[EnrichedArticle], target_words: usize) -> String {
    let body = articles
        .iter()
        .enumerate()
        .map(|(i, article)| {
            let stub = &article.stub;
            let text = if article.has_content() {
                truncate_chars(&article.content, PROMPT_CONTENT_CHARS)
            } else {
                stub.description.as_deref().unwrap_or("")
            };
            let link = stub.link.as_ref().map(|l| l.as_str()).unwrap_or("none");
            format!(
                "[{}] {}\nSource: {}\nLink: {}\n{}",
                i + 1,
                stub.title,
                stub.source,
                link,
                text
            )
        })
        .join("\n\n");

    format!(
        "Summarize the following {count} news articles in one concise, objective paragraph \
of at most {target_words} words. Cover the main topic, the key people and organizations, \
dates, locations and the outcome or current status. Do not speculate or add opinion.\n\n{body}",
        count = articles.len(),
    )
}

/// Produce the digest, or `None` on any failure.
///
/// An empty article list returns `None` without contacting the service.
#[instrument(level = "info", skip_all, fields(count = articles.len()))]
pub async fn summarize<A: AskAsync>(
    ask: &A,
    articles: &[EnrichedArticle],
    target_words: usize,
    deadline: Instant,
) -> Option<String> {
    if articles.is_empty() {
        info!("No articles; skipping digest");
        return None;
    }

    let prompt = build_prompt(articles, target_words);
    let result = if Instant::now() >= deadline {
        Err(SummarizationError::DeadlineExpired)
    } else {
        timeout_at(deadline, ask.ask(&prompt))
            .await
            .unwrap_or(Err(SummarizationError::DeadlineExpired))
    };

    match result {
        Ok(digest) => {
            info!(words = digest.split_whitespace().count(), "Digest produced");
            Some(digest)
        }
        Err(e) => {
            error!(error = %e, "Digest failed");
            None
        }
    }
}
