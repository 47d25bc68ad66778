use crate::error::{Result, ValidationError};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Category totals keyed by category name.
pub type Summary = BTreeMap<String, Decimal>;

/// Inclusive calendar range used by report queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    from: NaiveDate,
    to: NaiveDate,
}

impl DateRange {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Result<Self> {
        if from > to {
            return Err(ValidationError::InvertedRange {
                from: from.to_string(),
                to: to.to_string(),
            }
            .into());
        }
        Ok(Self { from, to })
    }

    pub fn from(&self) -> NaiveDate {
        self.from
    }

    pub fn to(&self) -> NaiveDate {
        self.to
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from <= date && date <= self.to
    }
}

/// One row of a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySummary {
    pub category: String,
    pub total: Decimal,
}

impl CategorySummary {
    pub fn rows(summary: &Summary) -> Vec<Self> {
        summary
            .iter()
            .map(|(category, total)| Self {
                category: category.clone(),
                total: *total,
            })
            .collect()
    }
}

/// Cache key for a report over a given range.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReportKey(String);

impl From<DateRange> for ReportKey {
    fn from(range: DateRange) -> Self {
        Self(format!(
            "report:summary:{}:{}",
            range.from.format("%Y-%m-%d"),
            range.to.format("%Y-%m-%d")
        ))
    }
}

impl ReportKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReportKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
