use super::budget::Budget;
use crate::error::LedgerError;
use rust_decimal::Decimal;

#[derive(Debug)]
pub enum Verdict {
    Accept,
    Reject(LedgerError),
}

impl Verdict {
    pub fn is_accept(&self) -> bool {
        matches!(self, Self::Accept)
    }

    pub fn into_result(self) -> Result<(), LedgerError> {
        match self {
            Self::Accept => Ok(()),
            Self::Reject(reason) => Err(reason),
        }
    }
}

/// Decides whether an incoming amount fits a category's budget.
///
/// Pure: the caller reads `current_spend` and performs the commit, and is
/// responsible for keeping both consistent with the decision.
pub struct BudgetGuard;

impl BudgetGuard {
    pub fn evaluate(
        category: &str,
        current_spend: Decimal,
        incoming: Decimal,
        budget: Option<&Budget>,
    ) -> Verdict {
        let Some(budget) = budget else {
            return Verdict::Accept;
        };

        // A total past the `Decimal` range is over any limit.
        let within = current_spend
            .checked_add(incoming)
            .is_some_and(|total| total <= budget.limit);
        if within {
            Verdict::Accept
        } else {
            Verdict::Reject(LedgerError::BudgetExceeded {
                category: category.to_string(),
                limit: budget.limit,
                spent: current_spend,
                requested: incoming,
            })
        }
    }
}
