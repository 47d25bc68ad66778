//! Category reports: one query per category, run concurrently and merged.
//!
//! Unlike bulk import, a report is all-or-nothing. The first failing
//! category aborts its siblings and the caller gets the error, never a
//! partial map.

use super::background::BackgroundTasks;
use super::context::Context;
use crate::domain::ports::{SharedCache, SharedTransactionStore};
use crate::domain::report::{DateRange, ReportKey, Summary};
use crate::error::{LedgerError, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, mpsc};
use tokio::task::{JoinHandle, JoinSet};

pub const DEFAULT_HEARTBEAT: Duration = Duration::from_millis(500);

/// Snapshot published on every heartbeat tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportProgress {
    pub completed: usize,
    pub total: usize,
}

/// Periodic liveness signal scoped to one `summarize` call.
///
/// Stops on its own when the context fires; dropping it aborts the task, so
/// every exit path of the owner tears it down.
struct Heartbeat {
    handle: JoinHandle<()>,
}

impl Heartbeat {
    fn start(
        ctx: Context,
        every: Duration,
        completed: Arc<AtomicUsize>,
        total: usize,
        observer: Option<mpsc::UnboundedSender<ReportProgress>>,
    ) -> Self {
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            // The first tick of an interval completes immediately.
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ctx.done() => break,
                    _ = ticker.tick() => {
                        let progress = ReportProgress {
                            completed: completed.load(Ordering::Relaxed),
                            total,
                        };
                        tracing::info!(
                            completed = progress.completed,
                            total = progress.total,
                            "report: still calculating..."
                        );
                        if let Some(observer) = &observer {
                            let _ = observer.send(progress);
                        }
                    }
                }
            }
        });
        Self { handle }
    }

    async fn stop(mut self) {
        self.handle.abort();
        let _ = (&mut self.handle).await;
    }
}

impl Drop for Heartbeat {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub struct ReportAggregator {
    store: SharedTransactionStore,
    heartbeat: Duration,
    observer: Option<mpsc::UnboundedSender<ReportProgress>>,
}

impl ReportAggregator {
    pub fn new(store: SharedTransactionStore) -> Self {
        Self {
            store,
            heartbeat: DEFAULT_HEARTBEAT,
            observer: None,
        }
    }

    pub fn with_heartbeat(mut self, every: Duration) -> Self {
        self.heartbeat = every;
        self
    }

    /// Also publish each heartbeat to `observer`.
    pub fn with_progress(mut self, observer: mpsc::UnboundedSender<ReportProgress>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Totals per category for transactions dated within `range`.
    pub async fn summarize(&self, ctx: &Context, range: DateRange) -> Result<Summary> {
        let categories = ctx.run(self.store.categories(range)).await?;
        let total = categories.len();
        tracing::debug!(total, from = %range.from(), to = %range.to(), "summarizing categories");

        let totals = Arc::new(Mutex::new(Summary::new()));
        let completed = Arc::new(AtomicUsize::new(0));
        let heartbeat = Heartbeat::start(
            ctx.clone(),
            self.heartbeat,
            Arc::clone(&completed),
            total,
            self.observer.clone(),
        );

        let mut tasks = JoinSet::new();
        for category in categories {
            let store = Arc::clone(&self.store);
            let ctx = ctx.clone();
            let totals = Arc::clone(&totals);
            let completed = Arc::clone(&completed);
            tasks.spawn(async move {
                let sum = ctx.run(store.sum_in_range(&category, range)).await?;
                totals.lock().await.insert(category, sum);
                completed.fetch_add(1, Ordering::Relaxed);
                Ok::<(), LedgerError>(())
            });
        }

        while let Some(joined) = tasks.join_next().await {
            let failure = match joined {
                Ok(Ok(())) => continue,
                Ok(Err(e)) => e,
                Err(e) => LedgerError::Internal(format!("report task failed: {e}")),
            };
            tracing::warn!(error = %failure, "report aborted");
            tasks.abort_all();
            return Err(failure);
        }
        heartbeat.stop().await;

        if let Some(interrupt) = ctx.err() {
            return Err(interrupt.into());
        }

        let mut totals = totals.lock().await;
        Ok(std::mem::take(&mut *totals))
    }
}

/// Read-through cache in front of [`ReportAggregator`].
///
/// A hit skips the fan-out entirely. A miss computes the report and
/// populates the cache in the background; cache failures are logged only.
pub struct CachedReports {
    aggregator: ReportAggregator,
    cache: SharedCache,
    ttl: Duration,
    background: BackgroundTasks,
}

impl CachedReports {
    pub fn new(
        aggregator: ReportAggregator,
        cache: SharedCache,
        ttl: Duration,
        background: BackgroundTasks,
    ) -> Self {
        Self {
            aggregator,
            cache,
            ttl,
            background,
        }
    }

    pub async fn summarize(&self, ctx: &Context, range: DateRange) -> Result<Summary> {
        let key = ReportKey::from(range);
        match self.cache.get_report(&key).await {
            Ok(Some(summary)) => {
                tracing::debug!(%key, "report cache hit");
                return Ok(summary);
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(%key, error = %e, "report cache read failed"),
        }

        let summary = self.aggregator.summarize(ctx, range).await?;

        let cache = Arc::clone(&self.cache);
        let (cached, ttl) = (summary.clone(), self.ttl);
        self.background.spawn("populate report", async move {
            cache.set_report(key, cached, ttl).await
        });
        Ok(summary)
    }
}
