use crate::domain::budget::Budget;
use crate::domain::ports::{BudgetStore, TransactionStore};
use crate::domain::report::DateRange;
use crate::domain::transaction::{Transaction, sum_amounts};
use crate::error::{LedgerError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, IteratorMode, Options};
use rust_decimal::Decimal;
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Column Family for budgets, keyed by category.
pub const CF_BUDGETS: &str = "budgets";
/// Column Family for the ledger, keyed by a big-endian sequence number.
pub const CF_TRANSACTIONS: &str = "transactions";

/// A persistent store implementation using RocksDB.
///
/// Budgets and committed transactions live in separate Column Families.
/// Transactions are appended under a monotonically increasing sequence, so
/// iteration order is commit order.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
    next_seq: Arc<AtomicU64>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at `path`, creating the column
    /// families if needed and resuming the transaction sequence.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_budgets = ColumnFamilyDescriptor::new(CF_BUDGETS, Options::default());
        let cf_transactions = ColumnFamilyDescriptor::new(CF_TRANSACTIONS, Options::default());

        let db = DB::open_cf_descriptors(&opts, path, vec![cf_budgets, cf_transactions])?;

        let next_seq = {
            let cf = column(&db, CF_TRANSACTIONS)?;
            match db.iterator_cf(cf, IteratorMode::End).next() {
                Some(item) => decode_seq(&item?.0)? + 1,
                None => 0,
            }
        };
        tracing::debug!(next_seq, "opened RocksDB ledger");

        Ok(Self {
            db: Arc::new(db),
            next_seq: Arc::new(AtomicU64::new(next_seq)),
        })
    }

    fn scan_transactions(&self) -> Result<Vec<Transaction>> {
        let cf = column(&self.db, CF_TRANSACTIONS)?;
        self.db
            .iterator_cf(cf, IteratorMode::Start)
            .map(|item| {
                let (_key, value) = item?;
                decode(&value)
            })
            .collect()
    }
}

fn column<'a>(db: &'a DB, name: &str) -> Result<&'a ColumnFamily> {
    db.cf_handle(name)
        .ok_or_else(|| LedgerError::Store(format!("column family '{name}' not found")))
}

fn decode_seq(key: &[u8]) -> Result<u64> {
    let bytes: [u8; 8] = key
        .try_into()
        .map_err(|_| LedgerError::Store("malformed transaction key".to_string()))?;
    Ok(u64::from_be_bytes(bytes))
}

fn encode<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(value)
        .map_err(|e| LedgerError::Store(format!("Serialization error: {e}")))
}

fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    serde_json::from_slice(bytes)
        .map_err(|e| LedgerError::Store(format!("Deserialization error: {e}")))
}

#[async_trait]
impl BudgetStore for RocksDBStore {
    async fn upsert(&self, budget: Budget) -> Result<()> {
        let cf = column(&self.db, CF_BUDGETS)?;
        self.db.put_cf(cf, budget.category.as_bytes(), encode(&budget)?)?;
        Ok(())
    }

    async fn get(&self, category: &str) -> Result<Option<Budget>> {
        let cf = column(&self.db, CF_BUDGETS)?;
        match self.db.get_cf(cf, category.as_bytes())? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn list(&self) -> Result<Vec<Budget>> {
        let cf = column(&self.db, CF_BUDGETS)?;
        self.db
            .iterator_cf(cf, IteratorMode::Start)
            .map(|item| {
                let (_key, value) = item?;
                decode(&value)
            })
            .collect()
    }
}

#[async_trait]
impl TransactionStore for RocksDBStore {
    async fn append(&self, tx: Transaction) -> Result<()> {
        let cf = column(&self.db, CF_TRANSACTIONS)?;
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        self.db.put_cf(cf, seq.to_be_bytes(), encode(&tx)?)?;
        Ok(())
    }

    async fn total_spent(&self, category: &str) -> Result<Decimal> {
        sum_amounts(
            self.scan_transactions()?
                .into_iter()
                .filter(|tx| tx.category == category)
                .map(|tx| tx.amount),
        )
    }

    async fn categories(&self, range: DateRange) -> Result<Vec<String>> {
        let distinct: BTreeSet<String> = self
            .scan_transactions()?
            .into_iter()
            .filter(|tx| tx.date().is_some_and(|d| range.contains(d)))
            .map(|tx| tx.category)
            .collect();
        Ok(distinct.into_iter().collect())
    }

    async fn sum_in_range(&self, category: &str, range: DateRange) -> Result<Decimal> {
        sum_amounts(
            self.scan_transactions()?
                .into_iter()
                .filter(|tx| tx.category == category)
                .filter(|tx| tx.date().is_some_and(|d| range.contains(d)))
                .map(|tx| tx.amount),
        )
    }

    async fn list(&self) -> Result<Vec<Transaction>> {
        self.scan_transactions()
    }
}
