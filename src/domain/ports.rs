use super::budget::Budget;
use super::report::{DateRange, ReportKey, Summary};
use super::transaction::Transaction;
use crate::error::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;

/// Budgets keyed by category. Upserts are last-write-wins.
#[async_trait]
pub trait BudgetStore: Send + Sync {
    async fn upsert(&self, budget: Budget) -> Result<()>;
    async fn get(&self, category: &str) -> Result<Option<Budget>>;
    async fn list(&self) -> Result<Vec<Budget>>;
}

/// Append-only ledger of committed transactions.
#[async_trait]
pub trait TransactionStore: Send + Sync {
    async fn append(&self, tx: Transaction) -> Result<()>;
    /// Cumulative spend for a category across the whole ledger.
    async fn total_spent(&self, category: &str) -> Result<Decimal>;
    /// Distinct categories with at least one transaction in `range`.
    async fn categories(&self, range: DateRange) -> Result<Vec<String>>;
    async fn sum_in_range(&self, category: &str, range: DateRange) -> Result<Decimal>;
    async fn list(&self) -> Result<Vec<Transaction>>;
}

/// Best-effort cache in front of report and budget reads. Never
/// authoritative: a miss or an error falls back to the stores.
#[async_trait]
pub trait Cache: Send + Sync {
    async fn get_report(&self, key: &ReportKey) -> Result<Option<Summary>>;
    async fn set_report(&self, key: ReportKey, summary: Summary, ttl: Duration) -> Result<()>;
    async fn invalidate_reports(&self) -> Result<()>;
    async fn get_budgets(&self) -> Result<Option<Vec<Budget>>>;
    async fn set_budgets(&self, budgets: Vec<Budget>, ttl: Duration) -> Result<()>;
    async fn invalidate_budgets(&self) -> Result<()>;
}

pub type SharedBudgetStore = Arc<dyn BudgetStore>;
pub type SharedTransactionStore = Arc<dyn TransactionStore>;
pub type SharedCache = Arc<dyn Cache>;
