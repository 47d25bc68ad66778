use crate::domain::transaction::Transaction;
use crate::error::{LedgerError, Result};
use std::io::Read;

/// Reads transactions from a CSV source with the header
/// `category,amount,description,timestamp`; the last two columns are optional.
///
/// Whitespace is trimmed and short records are accepted.
pub struct TransactionReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> TransactionReader<R> {
    /// Creates a new `TransactionReader` from any `Read` source (e.g., File, Stdin).
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Returns an iterator that lazily reads and deserializes transactions.
    pub fn transactions(self) -> impl Iterator<Item = Result<Transaction>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(LedgerError::from))
    }

    /// Collects every readable row, logging and skipping malformed ones.
    pub fn read_valid(self) -> Vec<Transaction> {
        self.transactions()
            .filter_map(|row| match row {
                Ok(tx) => Some(tx),
                Err(e) => {
                    tracing::warn!(error = %e, "Error reading transaction");
                    None
                }
            })
            .collect()
    }
}
