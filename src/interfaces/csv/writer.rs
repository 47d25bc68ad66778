use crate::domain::budget::Budget;
use crate::domain::report::{CategorySummary, Summary};
use crate::domain::transaction::Transaction;
use crate::error::Result;
use std::io::Write;

/// Writes ledger views as CSV with a header row.
pub struct LedgerWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> LedgerWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    /// One `category,total` row per category, sorted by category.
    pub fn write_summary(&mut self, summary: &Summary) -> Result<()> {
        if summary.is_empty() {
            self.writer.write_record(["category", "total"])?;
        }
        for row in CategorySummary::rows(summary) {
            self.writer.serialize(row)?;
        }
        self.writer.flush()?;
        Ok(())
    }

    pub fn write_budgets(&mut self, budgets: &[Budget]) -> Result<()> {
        self.writer.write_record(["category", "limit", "period"])?;
        for budget in budgets {
            self.writer.write_record([
                budget.category.as_str(),
                &budget.limit.to_string(),
                budget.period.as_deref().unwrap_or(""),
            ])?;
        }
        self.writer.flush()?;
        Ok(())
    }

    pub fn write_transactions(&mut self, transactions: &[Transaction]) -> Result<()> {
        self.writer
            .write_record(["category", "amount", "description", "timestamp"])?;
        for tx in transactions {
            self.writer.write_record([
                tx.category.as_str(),
                &tx.amount.to_string(),
                tx.description.as_deref().unwrap_or(""),
                &tx.timestamp.map(|ts| ts.to_rfc3339()).unwrap_or_default(),
            ])?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
