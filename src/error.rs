//! Error taxonomy for the pipeline.
//!
//! Only [`ConfigResolutionError`] ever reaches the orchestrator as an error;
//! the others are converted into degraded data (an empty stub list, a
//! sentinel content string, a missing digest) at the stage that raised them.

use thiserror::Error;

/// Failure of a single HTTP retrieval.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} answered HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("{url} not reachable: {reason}")]
    Unreachable { url: String, reason: String },
}

/// Failure to turn one source into stubs.
#[derive(Debug, Error)]
pub enum SourceFetchError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("could not decode feed {url}: {reason}")]
    Decode { url: String, reason: String },

    #[error("invalid selector {selector:?}: {reason}")]
    Selector { selector: String, reason: String },

    #[error("source {name} has kind {kind} but was given to the wrong fetcher")]
    WrongKind { name: String, kind: &'static str },
}

/// Failure to retrieve the body text of one article.
#[derive(Debug, Error)]
pub enum EnrichmentError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

/// The dynamic source map could not be obtained or understood.
#[derive(Debug, Error)]
pub enum ConfigResolutionError {
    #[error("dynamic configuration is not set up: {0}")]
    NotConfigured(String),

    #[error("authentication with the configuration account failed: {0}")]
    Auth(String),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("unexpected response from {url}: {reason}")]
    Response { url: String, reason: String },

    #[error("configuration account has no posts")]
    NoPost,

    #[error("configuration post is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("configuration post has the wrong shape: {0}")]
    Schema(String),

    #[error("run deadline expired while resolving sources")]
    DeadlineExpired,
}

/// The digest could not be produced.
#[derive(Debug, Error)]
pub enum SummarizationError {
    #[error("no API key configured for the generation service")]
    MissingApiKey,

    #[error("generation request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("generation service answered HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("generation service returned no text")]
    EmptyResponse,

    #[error("run deadline expired before the digest was produced")]
    DeadlineExpired,
}
