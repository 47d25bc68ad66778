use async_trait::async_trait;
use budget_ledger::application::background::BackgroundTasks;
use budget_ledger::application::context::Context;
use budget_ledger::application::report::{CachedReports, ReportAggregator, ReportProgress};
use budget_ledger::domain::budget::Budget;
use budget_ledger::domain::ports::{Cache, TransactionStore};
use budget_ledger::domain::report::{ReportKey, Summary};
use budget_ledger::domain::transaction::Transaction;
use budget_ledger::error::{LedgerError, Result};
use budget_ledger::infrastructure::in_memory::InMemoryCache;
use chrono::{TimeZone, Utc};
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

mod common;
use common::{ScriptedStore, january};

async fn seed(store: &ScriptedStore) {
    let at = Utc.with_ymd_and_hms(2024, 1, 10, 12, 0, 0).unwrap();
    for (category, amount) in [
        ("food", dec!(20)),
        ("food", dec!(5)),
        ("rent", dec!(900)),
        ("transport", dec!(45)),
    ] {
        store
            .append(Transaction::new(category, amount).at(at))
            .await
            .unwrap();
    }
}

/// Cache backend that is always down.
struct BrokenCache;

#[async_trait]
impl Cache for BrokenCache {
    async fn get_report(&self, _key: &ReportKey) -> Result<Option<Summary>> {
        Err(LedgerError::Store("cache unreachable".to_string()))
    }
    async fn set_report(&self, _key: ReportKey, _summary: Summary, _ttl: Duration) -> Result<()> {
        Err(LedgerError::Store("cache unreachable".to_string()))
    }
    async fn invalidate_reports(&self) -> Result<()> {
        Err(LedgerError::Store("cache unreachable".to_string()))
    }
    async fn get_budgets(&self) -> Result<Option<Vec<Budget>>> {
        Err(LedgerError::Store("cache unreachable".to_string()))
    }
    async fn set_budgets(&self, _budgets: Vec<Budget>, _ttl: Duration) -> Result<()> {
        Err(LedgerError::Store("cache unreachable".to_string()))
    }
    async fn invalidate_budgets(&self) -> Result<()> {
        Err(LedgerError::Store("cache unreachable".to_string()))
    }
}

#[tokio::test]
async fn test_one_failing_category_fails_the_report() {
    let store = Arc::new(ScriptedStore::new().failing("rent"));
    seed(&store).await;

    let err = ReportAggregator::new(store)
        .summarize(&Context::new(), january())
        .await
        .unwrap_err();

    assert!(matches!(err, LedgerError::Store(ref msg) if msg.contains("rent")));
}

#[tokio::test]
async fn test_one_query_per_category() {
    let store = Arc::new(ScriptedStore::new());
    seed(&store).await;

    let summary = ReportAggregator::new(store.clone())
        .summarize(&Context::new(), january())
        .await
        .unwrap();

    assert_eq!(store.sums(), 3);
    assert_eq!(summary["food"], dec!(25));
    assert_eq!(summary["rent"], dec!(900));
    assert_eq!(summary["transport"], dec!(45));
}

#[tokio::test(start_paused = true)]
async fn test_heartbeat_ticks_only_while_running() {
    let store = Arc::new(ScriptedStore::new().slow_sums(Duration::from_secs(1)));
    seed(&store).await;
    let (observer, mut progress) = mpsc::unbounded_channel();

    let aggregator = ReportAggregator::new(store)
        .with_heartbeat(Duration::from_millis(100))
        .with_progress(observer);
    aggregator.summarize(&Context::new(), january()).await.unwrap();

    let mut ticks = Vec::new();
    while let Ok(tick) = progress.try_recv() {
        ticks.push(tick);
    }
    assert!(ticks.len() >= 5, "only {} heartbeats", ticks.len());
    assert!(ticks.iter().all(|t: &ReportProgress| t.total == 3));

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert!(progress.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn test_deadline_abandons_slow_report() {
    let store = Arc::new(ScriptedStore::new().slow_sums(Duration::from_secs(60)));
    seed(&store).await;
    let ctx = Context::with_timeout(Duration::from_secs(1));

    let err = ReportAggregator::new(store)
        .summarize(&ctx, january())
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::DeadlineExceeded));
}

#[tokio::test]
async fn test_cache_hit_skips_fan_out() {
    let store = Arc::new(ScriptedStore::new());
    seed(&store).await;
    let background = BackgroundTasks::new();
    let reports = CachedReports::new(
        ReportAggregator::new(store.clone()),
        Arc::new(InMemoryCache::new()),
        Duration::from_secs(30),
        background.clone(),
    );

    let first = reports.summarize(&Context::new(), january()).await.unwrap();
    background.drain().await;
    let second = reports.summarize(&Context::new(), january()).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(store.sums(), 3);
}

#[tokio::test]
async fn test_cache_failures_never_reach_the_caller() {
    let store = Arc::new(ScriptedStore::new());
    seed(&store).await;
    let background = BackgroundTasks::new();
    let reports = CachedReports::new(
        ReportAggregator::new(store),
        Arc::new(BrokenCache),
        Duration::from_secs(30),
        background.clone(),
    );

    let summary = reports.summarize(&Context::new(), january()).await.unwrap();
    background.drain().await;

    assert_eq!(summary["food"], dec!(25));
}
