//! The run orchestrator.
//!
//! A run walks a fixed sequence of states:
//!
//! ```text
//! Init -> ResolvingSources -> Fetching -> Normalizing -> Enriching -> Summarizing -> Done
//!                \
//!                 -> Aborted
//! ```
//!
//! `Summarizing` is skipped in article mode. The only way to reach `Aborted`
//! is a source map that cannot be resolved under the `abort` policy. Every
//! other failure degrades the data and the run carries on, so [`Pipeline::run`]
//! always returns a value.

use itertools::Itertools;
use std::fmt;
use tokio::time::{Instant, timeout_at};
use tracing::{error, info, instrument, warn};

use crate::api::AskAsync;
use crate::config::{AppConfig, FallbackPolicy};
use crate::enrich::enrich;
use crate::error::ConfigResolutionError;
use crate::http::PageFetch;
use crate::models::{CategoryMap, RunMode, RunOutput, SourceDescriptor, SourceKind, SourceMode};
use crate::normalize::{exclusion_set, normalize};
use crate::registry::{self, ConfigProvider};
use crate::sources;
use crate::summarize::summarize;
use crate::tasks::TaskLimits;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Init,
    ResolvingSources,
    Fetching,
    Normalizing,
    Enriching,
    Summarizing,
    Done,
    Aborted,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunState::Init => "init",
            RunState::ResolvingSources => "resolving_sources",
            RunState::Fetching => "fetching",
            RunState::Normalizing => "normalizing",
            RunState::Enriching => "enriching",
            RunState::Summarizing => "summarizing",
            RunState::Done => "done",
            RunState::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

/// Final state of a run and what it produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub state: RunState,
    pub output: RunOutput,
}

/// Borrowed collaborators for one or more runs.
pub struct Pipeline<'a, F, C, A> {
    pub config: &'a AppConfig,
    pub fetcher: &'a F,
    pub provider: Option<&'a C>,
    pub ask: &'a A,
}

struct Transitions {
    state: RunState,
    started: Instant,
}

impl Transitions {
    fn new() -> Self {
        Self {
            state: RunState::Init,
            started: Instant::now(),
        }
    }

    fn enter(&mut self, next: RunState) {
        info!(
            from = %self.state,
            to = %next,
            elapsed_ms = self.started.elapsed().as_millis(),
            "State transition"
        );
        self.state = next;
    }

    fn finish(mut self, next: RunState, output: RunOutput) -> RunOutcome {
        self.enter(next);
        RunOutcome {
            state: self.state,
            output,
        }
    }
}

impl<'a, F, C, A> Pipeline<'a, F, C, A>
where
    F: PageFetch,
    C: ConfigProvider,
    A: AskAsync,
{
    /// Execute one run. Never fails; an aborted run returns the empty output of `mode`.
    #[instrument(level = "info", skip(self), fields(category = %self.config.category))]
    pub async fn run(&self, mode: RunMode, source_mode: SourceMode) -> RunOutcome {
        let deadline = Instant::now() + self.config.fetch.run_deadline();
        let limits = TaskLimits {
            concurrency: self.config.fetch.concurrency,
            deadline,
        };
        let mut run = Transitions::new();

        run.enter(RunState::ResolvingSources);
        let map = match self.resolve_sources(source_mode, deadline).await {
            Ok(map) => map,
            Err(e) => match self.config.dynamic.on_failure {
                FallbackPolicy::Abort => {
                    error!(error = %e, "Source map could not be resolved; aborting run");
                    return run.finish(RunState::Aborted, RunOutput::empty(mode));
                }
                FallbackPolicy::Static => {
                    warn!(error = %e, "Source map could not be resolved; using built-in sources");
                    registry::static_map()
                }
            },
        };

        run.enter(RunState::Fetching);
        let (feeds, scrapes) = self.plan_sources(&map);
        let (feed_stubs, scraped_stubs) = tokio::join!(
            sources::collect(self.fetcher, &feeds, limits, "feeds"),
            sources::collect(self.fetcher, &scrapes, limits, "scrapes"),
        );

        run.enter(RunState::Normalizing);
        let stubs = normalize(
            feed_stubs,
            scraped_stubs,
            &exclusion_set(&self.config.excluded_titles),
            self.config.limit,
        );

        run.enter(RunState::Enriching);
        let articles = enrich(self.fetcher, stubs, limits, self.config.fetch.max_content_chars).await;

        if mode == RunMode::Articles {
            return run.finish(RunState::Done, RunOutput::Articles(articles));
        }

        run.enter(RunState::Summarizing);
        let digest = summarize(self.ask, &articles, self.config.llm.target_words, deadline).await;
        run.finish(RunState::Done, RunOutput::Digest(digest))
    }

    async fn resolve_sources(
        &self,
        source_mode: SourceMode,
        deadline: Instant,
    ) -> Result<CategoryMap, ConfigResolutionError> {
        timeout_at(deadline, registry::resolve(source_mode, self.provider))
            .await
            .unwrap_or(Err(ConfigResolutionError::DeadlineExpired))
    }

    /// Feed sources of the category, and the scrape targets followed by the
    /// category's HTML sources.
    fn plan_sources(&self, map: &CategoryMap) -> (Vec<SourceDescriptor>, Vec<SourceDescriptor>) {
        let category = &self.config.category;
        let selected = map.sources(category);
        if map.is_empty() {
            warn!(%category, "Source map has no categories; only scrape targets will be used");
        } else if selected.is_empty() {
            warn!(
                %category,
                available = %map.categories().join(", "),
                "Category has no sources; only scrape targets will be used"
            );
        }

        let (feeds, html): (Vec<SourceDescriptor>, Vec<SourceDescriptor>) =
            selected.iter().cloned().partition(|s| s.kind == SourceKind::Feed);
        let mut scrapes = self.config.scrape_sources();
        scrapes.extend(html);

        info!(feeds = feeds.len(), scrapes = scrapes.len(), "Planned sources");
        (feeds, scrapes)
    }
}
