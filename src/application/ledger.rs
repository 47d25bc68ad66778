use super::background::BackgroundTasks;
use crate::domain::budget::Budget;
use crate::domain::guard::BudgetGuard;
use crate::domain::ports::{SharedBudgetStore, SharedCache, SharedTransactionStore};
use crate::domain::transaction::Transaction;
use crate::domain::validation::{Validate, ValidationMode, validate_budgeted_amount};
use crate::error::Result;
use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::OwnedMutexGuard;

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(30);

/// One async mutex per category, created on first use.
#[derive(Default)]
struct CategoryLocks {
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl CategoryLocks {
    async fn acquire(&self, category: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(locks.entry(category.to_string()).or_default())
        };
        lock.lock_owned().await
    }
}

/// Budget-enforcing ledger over injected stores.
///
/// Commits for the same category are serialized, so the spend read, the
/// guard decision and the append happen without another commit to that
/// category interleaving through this ledger. Writers that bypass this
/// ledger (another process on the same store) are not covered.
pub struct Ledger {
    budgets: SharedBudgetStore,
    transactions: SharedTransactionStore,
    cache: Option<SharedCache>,
    cache_ttl: Duration,
    background: BackgroundTasks,
    mode: ValidationMode,
    locks: CategoryLocks,
}

impl Ledger {
    pub fn new(budgets: SharedBudgetStore, transactions: SharedTransactionStore) -> Self {
        Self {
            budgets,
            transactions,
            cache: None,
            cache_ttl: DEFAULT_CACHE_TTL,
            background: BackgroundTasks::new(),
            mode: ValidationMode::default(),
            locks: CategoryLocks::default(),
        }
    }

    pub fn with_cache(mut self, cache: SharedCache, ttl: Duration) -> Self {
        self.cache = Some(cache);
        self.cache_ttl = ttl;
        self
    }

    pub fn with_background(mut self, background: BackgroundTasks) -> Self {
        self.background = background;
        self
    }

    pub fn with_validation(mut self, mode: ValidationMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn validation_mode(&self) -> ValidationMode {
        self.mode
    }

    pub fn transaction_store(&self) -> &SharedTransactionStore {
        &self.transactions
    }

    pub fn background(&self) -> &BackgroundTasks {
        &self.background
    }

    pub async fn set_budget(&self, budget: Budget) -> Result<()> {
        budget.validate(self.mode)?;
        tracing::debug!(category = %budget.category, limit = %budget.limit, "upserting budget");
        self.budgets.upsert(budget).await?;

        if let Some(cache) = &self.cache {
            let cache = Arc::clone(cache);
            self.background
                .spawn("invalidate budgets", async move { cache.invalidate_budgets().await });
        }
        Ok(())
    }

    pub async fn budget(&self, category: &str) -> Result<Option<Budget>> {
        self.budgets.get(category).await
    }

    /// All budgets, served from the cache when possible.
    pub async fn budgets(&self) -> Result<Vec<Budget>> {
        let Some(cache) = &self.cache else {
            return self.budgets.list().await;
        };

        match cache.get_budgets().await {
            Ok(Some(list)) => return Ok(list),
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "budget cache read failed"),
        }

        let list = self.budgets.list().await?;
        let cache = Arc::clone(cache);
        let (cached, ttl) = (list.clone(), self.cache_ttl);
        self.background
            .spawn("populate budgets", async move { cache.set_budgets(cached, ttl).await });
        Ok(list)
    }

    /// Validates and commits a single transaction.
    pub async fn create_transaction(&self, tx: Transaction) -> Result<Transaction> {
        tx.validate(self.mode)?;
        let committed = self.commit(tx.stamped(Utc::now())).await?;
        self.invalidate_reports();
        Ok(committed)
    }

    /// Guarded commit without validation or cache maintenance; import
    /// workers validate up front and invalidate once per batch.
    pub async fn commit(&self, tx: Transaction) -> Result<Transaction> {
        let _guard = self.locks.acquire(&tx.category).await;

        let budget = self.budgets.get(&tx.category).await?;
        if budget.is_some() {
            validate_budgeted_amount(&tx)?;
        }
        let spent = match &budget {
            Some(_) => self.transactions.total_spent(&tx.category).await?,
            None => Decimal::ZERO,
        };

        BudgetGuard::evaluate(&tx.category, spent, tx.amount, budget.as_ref()).into_result()?;

        let tx = tx.stamped(Utc::now());
        self.transactions.append(tx.clone()).await?;
        Ok(tx)
    }

    pub async fn transactions(&self) -> Result<Vec<Transaction>> {
        self.transactions.list().await
    }

    pub(crate) fn invalidate_reports(&self) {
        if let Some(cache) = &self.cache {
            let cache = Arc::clone(cache);
            self.background
                .spawn("invalidate reports", async move { cache.invalidate_reports().await });
        }
    }
}
