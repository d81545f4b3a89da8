//! Bounded-concurrency execution of independent per-item tasks.
//!
//! Sources in the fetch stage and stubs in the enrichment stage have no data
//! dependency on each other. [`run_isolated`] runs one task per item with at
//! most `concurrency` in flight, keeps each failure confined to its own item,
//! and hands results back in input order whatever the completion order was.

use futures::stream::{self, StreamExt};
use std::future::Future;
use thiserror::Error;
use tokio::time::{Instant, timeout_at};

/// Why a single task produced no value.
#[derive(Debug, Error)]
pub enum TaskFailure<E> {
    #[error(transparent)]
    Failed(E),

    #[error("run deadline expired before the task finished")]
    DeadlineExpired,
}

/// Limits applied to one stage.
#[derive(Debug, Clone, Copy)]
pub struct TaskLimits {
    pub concurrency: usize,
    pub deadline: Instant,
}

/// Run `task` over every item, isolating failures per item.
///
/// The returned vector has exactly one entry per item, at the item's index.
/// Tasks still running when `limits.deadline` passes are dropped and
/// reported as [`TaskFailure::DeadlineExpired`].
pub async fn run_isolated<'a, I, T, E, F, Fut>(
    items: &'a [I],
    limits: TaskLimits,
    task: F,
) -> Vec<Result<T, TaskFailure<E>>>
where
    F: Fn(&'a I) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut tagged: Vec<(usize, Result<T, TaskFailure<E>>)> = stream::iter(items.iter().enumerate())
        .map(|(idx, item)| {
            let fut = task(item);
            async move {
                let result = match timeout_at(limits.deadline, fut).await {
                    Ok(Ok(value)) => Ok(value),
                    Ok(Err(e)) => Err(TaskFailure::Failed(e)),
                    Err(_) => Err(TaskFailure::DeadlineExpired),
                };
                (idx, result)
            }
        })
        .buffer_unordered(limits.concurrency.max(1))
        .collect()
        .await;

    tagged.sort_by_key(|(idx, _)| *idx);
    tagged.into_iter().map(|(_, result)| result).collect()
}
