use crate::domain::budget::Budget;
use crate::domain::ports::{BudgetStore, Cache, TransactionStore};
use crate::domain::report::{DateRange, ReportKey, Summary};
use crate::domain::transaction::{Transaction, sum_amounts};
use crate::error::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

/// A thread-safe in-memory store for budgets.
///
/// Uses `Arc<RwLock<HashMap<String, Budget>>>` so clones share one map.
#[derive(Default, Clone)]
pub struct InMemoryBudgetStore {
    budgets: Arc<RwLock<HashMap<String, Budget>>>,
}

impl InMemoryBudgetStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BudgetStore for InMemoryBudgetStore {
    async fn upsert(&self, budget: Budget) -> Result<()> {
        let mut budgets = self.budgets.write().await;
        budgets.insert(budget.category.clone(), budget);
        Ok(())
    }

    async fn get(&self, category: &str) -> Result<Option<Budget>> {
        let budgets = self.budgets.read().await;
        Ok(budgets.get(category).cloned())
    }

    async fn list(&self) -> Result<Vec<Budget>> {
        let budgets = self.budgets.read().await;
        let mut list: Vec<Budget> = budgets.values().cloned().collect();
        list.sort_by(|a, b| a.category.cmp(&b.category));
        Ok(list)
    }
}

/// A thread-safe, append-only in-memory ledger.
///
/// Aggregates are computed by scanning; fine for tests and CLI-sized batches.
#[derive(Default, Clone)]
pub struct InMemoryTransactionStore {
    transactions: Arc<RwLock<Vec<Transaction>>>,
}

impl InMemoryTransactionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.transactions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

fn in_range(tx: &Transaction, range: DateRange) -> bool {
    tx.date().is_some_and(|date| range.contains(date))
}

#[async_trait]
impl TransactionStore for InMemoryTransactionStore {
    async fn append(&self, tx: Transaction) -> Result<()> {
        self.transactions.write().await.push(tx);
        Ok(())
    }

    async fn total_spent(&self, category: &str) -> Result<Decimal> {
        let transactions = self.transactions.read().await;
        sum_amounts(
            transactions
                .iter()
                .filter(|tx| tx.category == category)
                .map(|tx| tx.amount),
        )
    }

    async fn categories(&self, range: DateRange) -> Result<Vec<String>> {
        let transactions = self.transactions.read().await;
        let distinct: BTreeSet<&str> = transactions
            .iter()
            .filter(|tx| in_range(tx, range))
            .map(|tx| tx.category.as_str())
            .collect();
        Ok(distinct.into_iter().map(str::to_string).collect())
    }

    async fn sum_in_range(&self, category: &str, range: DateRange) -> Result<Decimal> {
        let transactions = self.transactions.read().await;
        sum_amounts(
            transactions
                .iter()
                .filter(|tx| tx.category == category && in_range(tx, range))
                .map(|tx| tx.amount),
        )
    }

    async fn list(&self) -> Result<Vec<Transaction>> {
        Ok(self.transactions.read().await.clone())
    }
}

struct Entry<T> {
    value: T,
    expires_at: Instant,
}

impl<T: Clone> Entry<T> {
    fn new(value: T, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: Instant::now() + ttl,
        }
    }

    fn live(&self) -> Option<T> {
        (Instant::now() < self.expires_at).then(|| self.value.clone())
    }
}

#[derive(Default)]
struct CacheState {
    reports: HashMap<ReportKey, Entry<Summary>>,
    budgets: Option<Entry<Vec<Budget>>>,
}

/// In-process TTL cache. Expired entries read as misses.
#[derive(Default, Clone)]
pub struct InMemoryCache {
    state: Arc<RwLock<CacheState>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Cache for InMemoryCache {
    async fn get_report(&self, key: &ReportKey) -> Result<Option<Summary>> {
        let state = self.state.read().await;
        Ok(state.reports.get(key).and_then(Entry::live))
    }

    async fn set_report(&self, key: ReportKey, summary: Summary, ttl: Duration) -> Result<()> {
        let mut state = self.state.write().await;
        state.reports.insert(key, Entry::new(summary, ttl));
        Ok(())
    }

    async fn invalidate_reports(&self) -> Result<()> {
        self.state.write().await.reports.clear();
        Ok(())
    }

    async fn get_budgets(&self) -> Result<Option<Vec<Budget>>> {
        let state = self.state.read().await;
        Ok(state.budgets.as_ref().and_then(Entry::live))
    }

    async fn set_budgets(&self, budgets: Vec<Budget>, ttl: Duration) -> Result<()> {
        self.state.write().await.budgets = Some(Entry::new(budgets, ttl));
        Ok(())
    }

    async fn invalidate_budgets(&self) -> Result<()> {
        self.state.write().await.budgets = None;
        Ok(())
    }
}
