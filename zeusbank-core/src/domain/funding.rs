//! Funding history - audit trail of admin balance injections

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One admin deposit, kept apart from the transaction log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FundingRecord {
    pub date: DateTime<Utc>,
    pub account_number: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub description: String,
}

impl FundingRecord {
    pub fn new(account_number: impl Into<String>, amount: Decimal, description: impl Into<String>) -> Self {
        Self {
            date: Utc::now(),
            account_number: account_number.into(),
            amount,
            description: description.into(),
        }
    }
}
