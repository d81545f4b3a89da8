//! Merging, filtering and capping of fetched stubs.
//!
//! Feed stubs always precede scraped stubs, each group in the order its
//! sources were listed. Only exact (trimmed) title matches against the
//! exclusion list are removed; there is no URL or fuzzy de-duplication.

use std::collections::HashSet;
use tracing::{debug, info};

use crate::models::ArticleStub;

/// Navigation labels that front pages and feeds emit as if they were headlines.
pub const DEFAULT_EXCLUDED_TITLES: [&str; 3] = ["Videos", "Air Quality Index", "Opinion"];

/// Headline count kept when no limit is configured.
pub const DEFAULT_LIMIT: usize = 10;

/// Concatenate, drop excluded titles, and keep the first `limit` stubs.
pub fn normalize(
    feed_stubs: Vec<ArticleStub>,
    scraped_stubs: Vec<ArticleStub>,
    excluded_titles: &HashSet<String>,
    limit: usize,
) -> Vec<ArticleStub> {
    let total = feed_stubs.len() + scraped_stubs.len();
    let mut excluded = 0usize;

    let kept: Vec<ArticleStub> = feed_stubs
        .into_iter()
        .chain(scraped_stubs)
        .filter(|stub| {
            let keep = !excluded_titles.contains(stub.title.trim());
            if !keep {
                excluded += 1;
                debug!(title = %stub.title, source = %stub.source, "Dropping excluded title");
            }
            keep
        })
        .take(limit)
        .collect();

    info!(total, excluded, kept = kept.len(), limit, "Normalized stubs");
    kept
}

/// Build the exclusion set from configured titles, trimming each entry.
pub fn exclusion_set<I, S>(titles: I) -> HashSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    titles
        .into_iter()
        .map(|t| t.as_ref().trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stubs(source: &str, titles: &[&str]) -> Vec<ArticleStub> {
        titles
            .iter()
            .filter_map(|t| ArticleStub::new(t, None, source, None))
            .collect()
    }

    fn titles(stubs: &[ArticleStub]) -> Vec<&str> {
        stubs.iter().map(|s| s.title.as_str()).collect()
    }

    #[test]
    fn test_feeds_precede_scrapes() {
        let out = normalize(
            stubs("feed", &["f1", "f2"]),
            stubs("site", &["s1"]),
            &exclusion_set(DEFAULT_EXCLUDED_TITLES),
            DEFAULT_LIMIT,
        );
        assert_eq!(titles(&out), vec!["f1", "f2", "s1"]);
    }

    #[test]
    fn test_excluded_titles_are_dropped() {
        let out = normalize(
            stubs("feed", &["Videos", "Real story"]),
            stubs("site", &["Opinion", "Air Quality Index", "Another story", "opinion"]),
            &exclusion_set(DEFAULT_EXCLUDED_TITLES),
            DEFAULT_LIMIT,
        );
        // Matching is exact, so a lowercase label survives.
        assert_eq!(titles(&out), vec!["Real story", "Another story", "opinion"]);
    }

    #[test]
    fn test_limit_applies_after_filtering() {
        let feed: Vec<String> = (0..8).map(|i| format!("f{i}")).collect();
        let feed_refs: Vec<&str> = feed.iter().map(String::as_str).collect();
        let mut feed_stubs = stubs("feed", &feed_refs);
        feed_stubs.insert(2, ArticleStub::new("Opinion", None, "feed", None).unwrap());

        let out = normalize(
            feed_stubs,
            stubs("site", &["s0", "s1", "s2", "s3"]),
            &exclusion_set(DEFAULT_EXCLUDED_TITLES),
            10,
        );
        assert_eq!(out.len(), 10);
        assert_eq!(out[7].title, "f7");
        assert_eq!(out[8].title, "s0");
        assert_eq!(out[9].title, "s1");
        assert!(out.iter().all(|s| s.title != "Opinion"));
    }

    #[test]
    fn test_zero_limit_and_empty_inputs() {
        let none = normalize(Vec::new(), Vec::new(), &HashSet::new(), DEFAULT_LIMIT);
        assert!(none.is_empty());

        let zero = normalize(stubs("feed", &["a"]), Vec::new(), &HashSet::new(), 0);
        assert!(zero.is_empty());
    }

    #[test]
    fn test_exclusion_set_trims_entries() {
        let set = exclusion_set(["  Videos ", "", "Opinion"]);
        assert_eq!(set.len(), 2);
        assert!(set.contains("Videos"));
    }
}
