//! Stateless validation rules for transactions and budgets.
//!
//! The same rules guard `Ledger::create_transaction` and every import job.

use super::budget::Budget;
use super::transaction::Transaction;
use crate::error::ValidationError;
use rust_decimal::Decimal;
use serde::Deserialize;

pub const MAX_CATEGORY_LEN: usize = 50;

/// How strictly transaction amounts are checked.
///
/// `Lenient` accepts any non-zero amount (refunds in unbudgeted categories);
/// `Strict` requires positive amounts and bounded category names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ValidationMode {
    #[default]
    Lenient,
    Strict,
}

pub trait Validate {
    fn validate(&self, mode: ValidationMode) -> Result<(), ValidationError>;
}

impl Validate for Transaction {
    fn validate(&self, mode: ValidationMode) -> Result<(), ValidationError> {
        if self.category.trim().is_empty() {
            return Err(ValidationError::EmptyCategory);
        }
        if self.amount.is_zero() {
            return Err(ValidationError::ZeroAmount);
        }
        if mode == ValidationMode::Strict {
            if self.amount < Decimal::ZERO {
                return Err(ValidationError::NonPositiveAmount);
            }
            if self.category.chars().count() > MAX_CATEGORY_LEN {
                return Err(ValidationError::CategoryTooLong {
                    max: MAX_CATEGORY_LEN,
                });
            }
        }
        Ok(())
    }
}

impl Validate for Budget {
    fn validate(&self, _mode: ValidationMode) -> Result<(), ValidationError> {
        if self.category.trim().is_empty() {
            return Err(ValidationError::EmptyCategory);
        }
        if self.limit <= Decimal::ZERO {
            return Err(ValidationError::NonPositiveLimit);
        }
        Ok(())
    }
}

/// Budgeted categories only take positive amounts, whatever the mode.
pub fn validate_budgeted_amount(tx: &Transaction) -> Result<(), ValidationError> {
    if tx.amount <= Decimal::ZERO {
        return Err(ValidationError::NonPositiveAmount);
    }
    Ok(())
}
