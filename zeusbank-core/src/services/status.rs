//! Status service - admin dashboard summary

use std::collections::BTreeMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::domain::result::Result;
use crate::ports::LedgerRepository;

pub struct StatusService {
    repository: Arc<dyn LedgerRepository>,
}

impl StatusService {
    pub fn new(repository: Arc<dyn LedgerRepository>) -> Self {
        Self { repository }
    }

    /// Counts and totals over the whole ledger
    pub fn get_status(&self) -> Result<StatusSummary> {
        let accounts = self.repository.get_accounts()?;
        let transactions = self.repository.get_transactions()?;
        let funding = self.repository.get_funding_history()?;

        let mut accounts_by_status = BTreeMap::new();
        for account in &accounts {
            *accounts_by_status
                .entry(account.status.to_string())
                .or_insert(0) += 1;
        }

        let mut transactions_by_status = BTreeMap::new();
        let mut transactions_by_type = BTreeMap::new();
        let mut pending_amount = Decimal::ZERO;
        for tx in &transactions {
            *transactions_by_status.entry(tx.status.to_string()).or_insert(0) += 1;
            *transactions_by_type.entry(tx.tx_type.to_string()).or_insert(0) += 1;
            if !tx.status.is_successful() {
                pending_amount += tx.amount;
            }
        }

        Ok(StatusSummary {
            backend: self.repository.backend().to_string(),
            total_accounts: accounts.len() as i64,
            accounts_by_status,
            total_balance: accounts.iter().map(|a| a.balance).sum(),
            total_transactions: transactions.len() as i64,
            transactions_by_status,
            transactions_by_type,
            pending_amount,
            total_funded: funding.iter().map(|f| f.amount).sum(),
            funding_count: funding.len() as i64,
            latest_transaction: transactions.iter().map(|t| t.timestamp).max().map(|t| t.to_rfc3339()),
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSummary {
    pub backend: String,
    pub total_accounts: i64,
    pub accounts_by_status: BTreeMap<String, i64>,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_balance: Decimal,
    pub total_transactions: i64,
    pub transactions_by_status: BTreeMap<String, i64>,
    pub transactions_by_type: BTreeMap<String, i64>,
    /// Sum of amounts still awaiting approval
    #[serde(with = "rust_decimal::serde::float")]
    pub pending_amount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_funded: Decimal,
    pub funding_count: i64,
    pub latest_transaction: Option<String>,
}
