// src/engine/queue.rs

//! Bounded-concurrency work queue.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;

use anyhow::anyhow;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::debug;

use crate::errors::{MonorunError, Result};

/// Run `producer` over every item with at most `limit` in flight.
///
/// `limit` is clamped to `1..=items.len()`. Results come back in
/// **completion order**, not submission order.
///
/// An `Err` from a producer (or a panicking worker) rejects the whole queue:
/// the remaining workers are aborted and the error is returned. Failures a
/// producer reports inside its `Ok` value never stop the queue.
pub async fn run_bounded<T, R, F, Fut>(items: Vec<T>, limit: usize, producer: F) -> Result<Vec<R>>
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R>> + Send + 'static,
{
    let total = items.len();
    if total == 0 {
        return Ok(Vec::new());
    }
    let workers = limit.clamp(1, total);
    debug!(total, workers, "starting work queue");

    let pending = Arc::new(Mutex::new(VecDeque::from(items)));
    let done = Arc::new(Mutex::new(Vec::with_capacity(total)));
    let producer = Arc::new(producer);

    let mut set = JoinSet::new();
    for _ in 0..workers {
        let pending = Arc::clone(&pending);
        let done = Arc::clone(&done);
        let producer = Arc::clone(&producer);

        set.spawn(async move {
            loop {
                let next = pending.lock().await.pop_front();
                let Some(item) = next else {
                    return Ok::<(), MonorunError>(());
                };
                let result = producer(item).await?;
                done.lock().await.push(result);
            }
        });
    }

    while let Some(joined) = set.join_next().await {
        let outcome: Result<()> = joined.map_err(|e| anyhow!("queue worker crashed: {e}"))?;
        if let Err(e) = outcome {
            set.abort_all();
            return Err(e);
        }
    }

    let results = std::mem::take(&mut *done.lock().await);
    debug_assert_eq!(results.len(), total);
    Ok(results)
}
