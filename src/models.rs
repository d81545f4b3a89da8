//! Data models flowing through the aggregation pipeline.
//!
//! This module defines the values passed from stage to stage:
//! - [`SourceDescriptor`]: One feed or front page to query, resolved per run
//! - [`CategoryMap`]: Named groups of sources, static or remotely configured
//! - [`ArticleStub`]: A headline-level record produced by the fetchers
//! - [`EnrichedArticle`]: A stub plus the text of the page it links to
//! - [`RunOutput`]: What a run hands back to its caller
//!
//! Nothing here is shared mutable state; every stage takes its inputs by
//! reference or value and returns new values.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use url::{Host, Url};

/// Placeholder description for feed entries that carry neither a summary nor content.
pub const NO_DESCRIPTION: &str = "No description available";

/// Content of an enriched article whose page could not be fetched or parsed.
pub const FAILED_CONTENT: &str = "Failed to fetch content";

/// Content of an enriched article whose stub had no link to follow.
pub const UNAVAILABLE_CONTENT: &str = "Full content not available";

/// How a source is retrieved and turned into stubs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// RSS, Atom or JSON Feed document.
    Feed,
    /// HTML page whose headlines are picked out by a CSS selector.
    Html,
}

/// A single source to query during a run.
///
/// `selector` is present exactly when `kind` is [`SourceKind::Html`]; use
/// [`SourceDescriptor::feed`] and [`SourceDescriptor::html`] to build one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDescriptor {
    pub name: String,
    pub address: Url,
    pub kind: SourceKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
}

impl SourceDescriptor {
    pub fn feed(name: impl Into<String>, address: Url) -> Self {
        Self {
            name: name.into(),
            address,
            kind: SourceKind::Feed,
            selector: None,
        }
    }

    pub fn html(name: impl Into<String>, address: Url, selector: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address,
            kind: SourceKind::Html,
            selector: Some(selector.into()),
        }
    }

    /// Second-level domain of the address, e.g. `"nytimes"` for `rss.nytimes.com`.
    /// IP hosts are returned whole.
    ///
    /// Used as a display name for sources configured without one.
    pub fn host_tag(address: &Url) -> String {
        match address.host() {
            Some(Host::Domain(host)) => {
                let parts: Vec<&str> = host.split('.').filter(|p| *p != "www").collect();
                if parts.len() >= 2 {
                    parts[parts.len() - 2].to_string()
                } else {
                    host.to_string()
                }
            }
            Some(Host::Ipv4(ip)) => ip.to_string(),
            Some(Host::Ipv6(ip)) => ip.to_string(),
            None => address.to_string(),
        }
    }
}

/// Category name to ordered source list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryMap(BTreeMap<String, Vec<SourceDescriptor>>);

impl CategoryMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, category: impl Into<String>, sources: Vec<SourceDescriptor>) {
        self.0.insert(category.into(), sources);
    }

    /// Sources registered under `category`; unknown categories are empty.
    pub fn sources(&self, category: &str) -> &[SourceDescriptor] {
        self.0.get(category).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A headline-level article record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleStub {
    pub title: String,
    pub link: Option<Url>,
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ArticleStub {
    /// Build a stub, trimming the title. Returns `None` when nothing is left.
    pub fn new(
        title: &str,
        link: Option<Url>,
        source: impl Into<String>,
        description: Option<String>,
    ) -> Option<Self> {
        let title = title.trim();
        if title.is_empty() {
            return None;
        }
        Some(Self {
            title: title.to_string(),
            link,
            source: source.into(),
            description,
        })
    }
}

/// An [`ArticleStub`] together with the body text of its linked page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichedArticle {
    #[serde(flatten)]
    pub stub: ArticleStub,
    /// Extracted text, or one of [`FAILED_CONTENT`] / [`UNAVAILABLE_CONTENT`].
    pub content: String,
}

impl EnrichedArticle {
    pub fn new(stub: ArticleStub, content: impl Into<String>) -> Self {
        Self {
            stub,
            content: content.into(),
        }
    }

    /// `true` when `content` is real page text rather than a sentinel.
    pub fn has_content(&self) -> bool {
        self.content != FAILED_CONTENT && self.content != UNAVAILABLE_CONTENT
    }
}

/// What a run produces, depending on its [`RunMode`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunOutput {
    Articles(Vec<EnrichedArticle>),
    Digest(Option<String>),
}

impl RunOutput {
    /// The empty result of the given mode, returned by aborted runs.
    pub fn empty(mode: RunMode) -> Self {
        match mode {
            RunMode::Articles => RunOutput::Articles(Vec::new()),
            RunMode::Digest => RunOutput::Digest(None),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            RunOutput::Articles(articles) => articles.is_empty(),
            RunOutput::Digest(digest) => digest.is_none(),
        }
    }
}

/// Whether a run stops after enrichment or goes on to produce a digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    #[default]
    Articles,
    Digest,
}

/// Where the run's category map comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SourceMode {
    #[default]
    Static,
    Dynamic,
}
