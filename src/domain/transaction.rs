use crate::error::{LedgerError, Result};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single expense entry.
///
/// `timestamp` is optional on input; the ledger stamps it with the
/// submission time before commit, so committed transactions always carry one.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Transaction {
    pub category: String,
    pub amount: Decimal,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl Transaction {
    pub fn new(category: impl Into<String>, amount: Decimal) -> Self {
        Self {
            category: category.into(),
            amount,
            description: None,
            timestamp: None,
        }
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Fills a missing timestamp with `now`. An existing timestamp is kept.
    pub fn stamped(mut self, now: DateTime<Utc>) -> Self {
        self.timestamp.get_or_insert(now);
        self
    }

    /// Calendar day the transaction is booked on, if it has been stamped.
    pub fn date(&self) -> Option<NaiveDate> {
        self.timestamp.map(|ts| ts.date_naive())
    }
}

/// Sums amounts, failing instead of panicking when the total leaves the
/// `Decimal` range.
pub fn sum_amounts<I>(amounts: I) -> Result<Decimal>
where
    I: IntoIterator<Item = Decimal>,
{
    amounts
        .into_iter()
        .try_fold(Decimal::ZERO, |total, amount| total.checked_add(amount))
        .ok_or_else(|| LedgerError::Store("amount total overflowed".to_string()))
}
