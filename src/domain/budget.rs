use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Spending limit for one category. `period` is a free-form tag and is not
/// enforced; the limit applies to the category's cumulative spend.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Budget {
    pub category: String,
    pub limit: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period: Option<String>,
}

impl Budget {
    pub fn new(category: impl Into<String>, limit: Decimal) -> Self {
        Self {
            category: category.into(),
            limit,
            period: None,
        }
    }

    pub fn with_period(mut self, period: impl Into<String>) -> Self {
        self.period = Some(period.into());
        self
    }
}
