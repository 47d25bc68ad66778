#![allow(dead_code)]

use async_trait::async_trait;
use budget_ledger::application::context::Context;
use budget_ledger::domain::ports::TransactionStore;
use budget_ledger::domain::report::DateRange;
use budget_ledger::domain::transaction::Transaction;
use budget_ledger::error::{LedgerError, Result};
use budget_ledger::infrastructure::in_memory::InMemoryTransactionStore;
use chrono::NaiveDate;
use rand::Rng;
use rust_decimal::Decimal;
use std::fs::File;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

pub const CATEGORIES: [&str; 5] = ["food", "transport", "rent", "fun", "health"];

/// Writes `rows` random, valid transactions dated in January 2024.
pub fn generate_csv(path: &Path, rows: usize) -> std::io::Result<()> {
    let file = File::create(path)?;
    let mut wtr = csv::WriterBuilder::new().from_writer(file);
    let mut rng = rand::thread_rng();

    wtr.write_record(["category", "amount", "description", "timestamp"])?;
    for i in 1..=rows {
        let category = CATEGORIES[rng.gen_range(0..CATEGORIES.len())];
        let amount = rng.gen_range(1..100u32);
        let day = rng.gen_range(1..=31u32);
        wtr.write_record([
            category,
            &amount.to_string(),
            &format!("row {i}"),
            &format!("2024-01-{day:02}T12:00:00Z"),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

pub fn january() -> DateRange {
    DateRange::new(
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
    )
    .unwrap()
}

/// In-memory store with knobs: cancel a context after N appends, slow down
/// appends or range sums, fail or panic on one category, and count calls.
#[derive(Default)]
pub struct ScriptedStore {
    inner: InMemoryTransactionStore,
    cancel_after: Option<(usize, Context)>,
    append_delay: Option<Duration>,
    sum_delay: Option<Duration>,
    failing_category: Option<String>,
    failing_appends: Option<String>,
    panicking_appends: Option<String>,
    appends: AtomicUsize,
    sums: AtomicUsize,
}

impl ScriptedStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel_after(mut self, appends: usize, ctx: Context) -> Self {
        self.cancel_after = Some((appends, ctx));
        self
    }

    pub fn slow_appends(mut self, delay: Duration) -> Self {
        self.append_delay = Some(delay);
        self
    }

    pub fn slow_sums(mut self, delay: Duration) -> Self {
        self.sum_delay = Some(delay);
        self
    }

    pub fn failing(mut self, category: &str) -> Self {
        self.failing_category = Some(category.to_string());
        self
    }

    /// Appends for `category` fail with a store error.
    pub fn failing_appends(mut self, category: &str) -> Self {
        self.failing_appends = Some(category.to_string());
        self
    }

    /// Appends for `category` panic, killing the calling task.
    pub fn panicking_appends(mut self, category: &str) -> Self {
        self.panicking_appends = Some(category.to_string());
        self
    }

    pub fn appends(&self) -> usize {
        self.appends.load(Ordering::SeqCst)
    }

    pub fn sums(&self) -> usize {
        self.sums.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TransactionStore for ScriptedStore {
    async fn append(&self, tx: Transaction) -> Result<()> {
        if let Some(delay) = self.append_delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing_appends.as_deref() == Some(tx.category.as_str()) {
            return Err(LedgerError::Store(format!("{} partition read-only", tx.category)));
        }
        if self.panicking_appends.as_deref() == Some(tx.category.as_str()) {
            panic!("{} partition corrupted", tx.category);
        }
        self.inner.append(tx).await?;
        let appended = self.appends.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((after, ctx)) = &self.cancel_after {
            if appended == *after {
                ctx.cancel();
            }
        }
        Ok(())
    }

    async fn total_spent(&self, category: &str) -> Result<Decimal> {
        self.inner.total_spent(category).await
    }

    async fn categories(&self, range: DateRange) -> Result<Vec<String>> {
        self.inner.categories(range).await
    }

    async fn sum_in_range(&self, category: &str, range: DateRange) -> Result<Decimal> {
        self.sums.fetch_add(1, Ordering::SeqCst);
        if self.failing_category.as_deref() == Some(category) {
            return Err(LedgerError::Store(format!("{category} partition offline")));
        }
        if let Some(delay) = self.sum_delay {
            tokio::time::sleep(delay).await;
        }
        self.inner.sum_in_range(category, range).await
    }

    async fn list(&self) -> Result<Vec<Transaction>> {
        self.inner.list().await
    }
}
