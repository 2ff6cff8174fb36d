//! Transaction domain model

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::result::{Error, Result};

/// Counterparty for withdrawals leaving the bank
pub const EXTERNAL_ACCOUNT: &str = "EXTERNAL";

/// Source of admin balance injections
pub const ADMIN_ACCOUNT: &str = "ADMIN";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Transfer,
    Deposit,
    Withdrawal,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Transfer => "transfer",
            TransactionType::Deposit => "deposit",
            TransactionType::Withdrawal => "withdrawal",
        }
    }

    /// Money leaves `fromAccount` for these types
    pub fn is_outgoing(&self) -> bool {
        matches!(self, TransactionType::Transfer | TransactionType::Withdrawal)
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "transfer" => Ok(TransactionType::Transfer),
            "deposit" => Ok(TransactionType::Deposit),
            "withdrawal" => Ok(TransactionType::Withdrawal),
            other => Err(Error::validation(format!("unknown transaction type: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Successful,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Successful => "successful",
        }
    }

    pub fn is_successful(&self) -> bool {
        matches!(self, TransactionStatus::Successful)
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(TransactionStatus::Pending),
            "successful" => Ok(TransactionStatus::Successful),
            other => Err(Error::validation(format!("unknown transaction status: {}", other))),
        }
    }
}

/// A single money movement. There is exactly one record per economic event;
/// per-account logs are projections of these records (see [`Transaction::as_seen_by`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    pub from_account: String,
    pub to_account: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    #[serde(rename = "type")]
    pub tx_type: TransactionType,
    pub status: TransactionStatus,
    #[serde(default)]
    pub memo: String,
    #[serde(rename = "date")]
    pub timestamp: DateTime<Utc>,
    /// Whether the balance effects are in place, when that differs from
    /// what `status` implies. Set by raw policy rewrites, cleared by edits.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balance_applied: Option<bool>,
}

/// One signed balance movement against an account number
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceEffect {
    pub account_number: String,
    pub delta: Decimal,
}

impl Transaction {
    pub fn new(
        id: String,
        from_account: impl Into<String>,
        to_account: impl Into<String>,
        amount: Decimal,
        tx_type: TransactionType,
        status: TransactionStatus,
        memo: impl Into<String>,
    ) -> Self {
        Self {
            id,
            from_account: from_account.into(),
            to_account: to_account.into(),
            amount,
            tx_type,
            status,
            memo: memo.into(),
            timestamp: Utc::now(),
            balance_applied: None,
        }
    }

    /// Millisecond timestamp followed by a random 0-999 suffix
    pub fn generate_id() -> String {
        let suffix: u32 = rand::thread_rng().gen_range(0..1000);
        format!("{}{}", Utc::now().timestamp_millis(), suffix)
    }

    /// Account whose own log carries this record
    pub fn owner(&self) -> &str {
        match self.tx_type {
            TransactionType::Deposit => &self.to_account,
            TransactionType::Transfer | TransactionType::Withdrawal => &self.from_account,
        }
    }

    /// Balance movements this transaction causes when successful at `amount`.
    ///
    /// Deposits credit `toAccount`; transfers and withdrawals debit
    /// `fromAccount`; transfers also credit `toAccount`. Whether the
    /// counterparty exists is for the registry to decide.
    pub fn effects_at(&self, amount: Decimal) -> Vec<BalanceEffect> {
        match self.tx_type {
            TransactionType::Deposit => vec![BalanceEffect {
                account_number: self.to_account.clone(),
                delta: amount,
            }],
            TransactionType::Withdrawal => vec![BalanceEffect {
                account_number: self.from_account.clone(),
                delta: -amount,
            }],
            TransactionType::Transfer => vec![
                BalanceEffect {
                    account_number: self.from_account.clone(),
                    delta: -amount,
                },
                BalanceEffect {
                    account_number: self.to_account.clone(),
                    delta: amount,
                },
            ],
        }
    }

    /// Whether balances currently carry this record's effects
    pub fn is_applied(&self) -> bool {
        self.balance_applied.unwrap_or_else(|| self.status.is_successful())
    }

    /// Rewrite the status without touching balances
    pub fn restate(&mut self, status: TransactionStatus) {
        let applied = self.is_applied();
        self.status = status;
        self.balance_applied = (applied != status.is_successful()).then_some(applied);
    }

    /// Effects already booked against balances (empty while pending)
    pub fn current_effects(&self) -> Vec<BalanceEffect> {
        if self.is_applied() {
            self.effects_at(self.amount)
        } else {
            Vec::new()
        }
    }

    /// Whether this record shows up in `account_number`'s log
    pub fn involves(&self, account_number: &str) -> bool {
        self.as_seen_by(account_number).is_some()
    }

    /// Project the record into `account_number`'s log.
    ///
    /// The owner sees the record as-is. The recipient of a transfer whose
    /// credit was booked sees a successful deposit carrying the same id,
    /// amount and memo, whatever the sender's record now says.
    pub fn as_seen_by(&self, account_number: &str) -> Option<Transaction> {
        if self.owner() == account_number {
            return Some(self.clone());
        }
        if self.tx_type == TransactionType::Transfer
            && self.is_applied()
            && self.to_account == account_number
        {
            let mut mirror = self.clone();
            mirror.tx_type = TransactionType::Deposit;
            mirror.status = TransactionStatus::Successful;
            mirror.balance_applied = None;
            return Some(mirror);
        }
        None
    }
}

/// Newest first by timestamp, ties broken by id descending
pub fn sort_newest_first(transactions: &mut [Transaction]) {
    transactions.sort_by(|a, b| {
        b.timestamp
            .cmp(&a.timestamp)
            .then_with(|| b.id.cmp(&a.id))
    });
}
