use rust_decimal::Decimal;
use thiserror::Error;

/// Reasons a transaction or budget is rejected before it reaches the store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("category cannot be empty")]
    EmptyCategory,
    #[error("category name longer than {max} characters")]
    CategoryTooLong { max: usize },
    #[error("amount cannot be zero")]
    ZeroAmount,
    #[error("amount must be greater than zero")]
    NonPositiveAmount,
    #[error("budget limit must be greater than zero")]
    NonPositiveLimit,
    #[error("range start {from} is after range end {to}")]
    InvertedRange { from: String, to: String },
}

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),
    #[error(
        "budget exceeded for '{category}': limit {limit}, spent {spent}, requested {requested}"
    )]
    BudgetExceeded {
        category: String,
        limit: Decimal,
        spent: Decimal,
        requested: Decimal,
    },
    #[error("store error: {0}")]
    Store(String),
    #[error("operation canceled")]
    Canceled,
    #[error("deadline exceeded")]
    DeadlineExceeded,
    #[error("internal error: {0}")]
    Internal(String),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[cfg(feature = "storage-rocksdb")]
    #[error("RocksDB error: {0}")]
    RocksDb(#[from] rocksdb::Error),
}

impl LedgerError {
    /// True for the two context interruptions, which callers handle apart
    /// from ordinary failures.
    pub fn is_interrupt(&self) -> bool {
        matches!(self, Self::Canceled | Self::DeadlineExceeded)
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_budget_exceeded_message_carries_diagnostics() {
        let err = LedgerError::BudgetExceeded {
            category: "food".to_string(),
            limit: dec!(2000),
            spent: dec!(1500),
            requested: dec!(1000),
        };
        let message = err.to_string();
        assert!(message.contains("food"));
        assert!(message.contains("2000"));
        assert!(message.contains("1500"));
        assert!(message.contains("1000"));
    }

    #[test]
    fn test_interrupts_are_distinct_from_failures() {
        assert!(LedgerError::Canceled.is_interrupt());
        assert!(LedgerError::DeadlineExceeded.is_interrupt());
        assert!(!LedgerError::Store("down".to_string()).is_interrupt());
        assert!(!LedgerError::from(ValidationError::ZeroAmount).is_interrupt());
    }
}
