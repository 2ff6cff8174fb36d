//! Ledger service - transfers, admin funding and transaction corrections
//!
//! Every mutation runs under the shared mutation lock and lands as a single
//! changeset, so balances and the transaction log never disagree on disk.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;

use super::lock_ledger;
use crate::domain::result::{Error, Result};
use crate::domain::{
    sort_newest_first, AccountRegistry, FundingRecord, Transaction, TransactionStatus,
    TransactionType, ADMIN_ACCOUNT,
};
use crate::ports::{Changeset, LedgerRepository};

const DEFAULT_FUNDING_MEMO: &str = "Admin deposit";

/// Customer-initiated movement of money
#[derive(Debug, Clone, Default)]
pub struct TransferRequest {
    pub from_account: String,
    pub to_account: String,
    pub amount: Decimal,
    pub memo: String,
    /// Forces the classification; `None` lets the recipient decide
    pub tx_type: Option<TransactionType>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferOutcome {
    pub transaction: Transaction,
    pub message: String,
    /// Amount reached the admin alert threshold
    pub alert: bool,
}

/// Admin correction of an existing transaction
#[derive(Debug, Clone, Default)]
pub struct TransactionEdit {
    pub amount: Option<Decimal>,
    pub status: Option<TransactionStatus>,
}

/// Filters for transaction listings. Empty filter lists the whole ledger.
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    /// Owner id; resolved to the owner's account number
    pub user_id: Option<String>,
    pub account_number: Option<String>,
    pub tx_type: Option<TransactionType>,
    pub status: Option<TransactionStatus>,
}

pub struct LedgerService {
    repository: Arc<dyn LedgerRepository>,
    lock: Arc<Mutex<()>>,
}

impl LedgerService {
    pub fn new(repository: Arc<dyn LedgerRepository>, lock: Arc<Mutex<()>>) -> Self {
        Self { repository, lock }
    }

    /// Move money out of `from_account`.
    ///
    /// A known recipient makes this a transfer under the interbank status;
    /// anything else leaves the bank as a withdrawal. Successful records
    /// move balances immediately, pending ones wait for an admin edit.
    pub fn transfer(&self, request: TransferRequest) -> Result<TransferOutcome> {
        let from = request.from_account.trim();
        let to = request.to_account.trim();
        if from.is_empty() || to.is_empty() {
            return Err(Error::validation("fromAccount and toAccount are required"));
        }
        validate_amount(request.amount)?;
        if request.tx_type == Some(TransactionType::Deposit) {
            return Err(Error::validation(
                "Deposits are made by the bank, not requested by customers",
            ));
        }

        let _guard = lock_ledger(&self.lock)?;
        let mut registry = AccountRegistry::new(self.repository.get_accounts()?);
        let settings = self.repository.get_settings()?;
        let transactions = self.repository.get_transactions()?;

        let sender = registry
            .find_by_number(from)
            .ok_or_else(|| Error::not_found("Sender account not found"))?;
        if sender.balance < request.amount {
            return Err(Error::InsufficientFunds);
        }

        if settings.enforce_daily_limit && !settings.daily_transfer_limit.is_zero() {
            let spent = outgoing_today(&transactions, from);
            if spent + request.amount > settings.daily_transfer_limit {
                return Err(Error::validation(format!(
                    "Daily transfer limit of {} exceeded",
                    settings.daily_transfer_limit
                )));
            }
        }

        let recipient_known = registry.contains(to);
        let (tx_type, status) = match (request.tx_type, recipient_known) {
            (Some(TransactionType::Withdrawal), _) | (None, false) => {
                (TransactionType::Withdrawal, settings.withdrawal_status)
            }
            (_, true) => (TransactionType::Transfer, settings.interbank_transfer_status),
            (Some(_), false) => (TransactionType::Transfer, settings.default_transaction_status),
        };

        let transaction = Transaction::new(
            unique_id(&transactions),
            from,
            to,
            request.amount,
            tx_type,
            status,
            request.memo.trim(),
        );
        registry.apply_effects(&transaction.current_effects(), Decimal::ONE);

        self.repository.commit(Changeset {
            upsert_accounts: registry.take_dirty(),
            upsert_transactions: vec![transaction.clone()],
            ..Default::default()
        })?;

        let message = if status.is_successful() {
            "Transaction completed successfully"
        } else {
            "Transaction is pending approval"
        };
        Ok(TransferOutcome {
            alert: request.amount >= settings.admin_alert_threshold,
            message: message.to_string(),
            transaction,
        })
    }

    /// Admin deposit: credits immediately and records a funding entry
    pub fn fund_account(
        &self,
        account_number: &str,
        amount: Decimal,
        description: Option<&str>,
    ) -> Result<Transaction> {
        let account_number = account_number.trim();
        validate_amount(amount)?;

        let _guard = lock_ledger(&self.lock)?;
        let mut registry = AccountRegistry::new(self.repository.get_accounts()?);
        if !registry.contains(account_number) {
            return Err(Error::account_not_found(account_number));
        }
        let transactions = self.repository.get_transactions()?;

        let memo = description
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .unwrap_or(DEFAULT_FUNDING_MEMO);
        let transaction = Transaction::new(
            unique_id(&transactions),
            ADMIN_ACCOUNT,
            account_number,
            amount,
            TransactionType::Deposit,
            TransactionStatus::Successful,
            memo,
        );
        registry.apply_delta(account_number, amount)?;

        self.repository.commit(Changeset {
            upsert_accounts: registry.take_dirty(),
            upsert_transactions: vec![transaction.clone()],
            append_funding: vec![FundingRecord::new(account_number, amount, memo)],
            ..Default::default()
        })?;

        Ok(transaction)
    }

    /// Change amount and/or status, moving balances to match
    pub fn edit_transaction(&self, id: &str, edit: TransactionEdit) -> Result<Transaction> {
        if let Some(amount) = edit.amount {
            validate_amount(amount)?;
        }

        let _guard = lock_ledger(&self.lock)?;
        let before = self
            .repository
            .get_transaction(id)?
            .ok_or_else(|| Error::transaction_not_found(id))?;

        let mut after = before.clone();
        if let Some(amount) = edit.amount {
            after.amount = amount;
        }
        if let Some(status) = edit.status {
            after.status = status;
        }
        // An edit brings balances back in line with the status
        after.balance_applied = None;

        let mut registry = AccountRegistry::new(self.repository.get_accounts()?);
        registry.reconcile(&before, &after);

        self.repository.commit(Changeset {
            upsert_accounts: registry.take_dirty(),
            upsert_transactions: vec![after.clone()],
            ..Default::default()
        })?;

        Ok(after)
    }

    /// Remove a record, undoing its balance effect if it was booked
    pub fn delete_transaction(&self, id: &str) -> Result<Transaction> {
        let _guard = lock_ledger(&self.lock)?;
        let existing = self
            .repository
            .get_transaction(id)?
            .ok_or_else(|| Error::transaction_not_found(id))?;

        let mut registry = AccountRegistry::new(self.repository.get_accounts()?);
        registry.apply_effects(&existing.current_effects(), Decimal::NEGATIVE_ONE);

        self.repository.commit(Changeset {
            upsert_accounts: registry.take_dirty(),
            delete_transactions: vec![existing.id.clone()],
            ..Default::default()
        })?;

        Ok(existing)
    }

    pub fn get_transaction(&self, id: &str) -> Result<Transaction> {
        self.repository
            .get_transaction(id)?
            .ok_or_else(|| Error::transaction_not_found(id))
    }

    /// Transactions matching `filter`, newest first.
    ///
    /// With an owner or account number the listing is that account's log:
    /// incoming successful transfers appear as deposits.
    pub fn list_transactions(&self, filter: &TransactionFilter) -> Result<Vec<Transaction>> {
        let account_number = match (&filter.user_id, &filter.account_number) {
            (Some(user_id), _) => Some(
                self.repository
                    .get_account_by_id(user_id)?
                    .ok_or_else(|| Error::not_found(format!("user {}", user_id)))?
                    .account_number,
            ),
            (None, Some(number)) => Some(number.trim().to_string()),
            (None, None) => None,
        };

        let transactions = self.repository.get_transactions()?;
        let mut listed: Vec<Transaction> = match &account_number {
            Some(number) => transactions
                .iter()
                .filter_map(|t| t.as_seen_by(number))
                .collect(),
            None => transactions,
        };
        listed.retain(|t| {
            filter.tx_type.map_or(true, |ty| t.tx_type == ty)
                && filter.status.map_or(true, |st| t.status == st)
        });
        sort_newest_first(&mut listed);
        Ok(listed)
    }

    pub fn funding_history(&self) -> Result<Vec<FundingRecord>> {
        self.repository.get_funding_history()
    }
}

fn validate_amount(amount: Decimal) -> Result<()> {
    if amount <= Decimal::ZERO {
        return Err(Error::validation("Amount must be greater than zero"));
    }
    Ok(())
}

/// Outgoing volume (any status) booked by `account_number` on the current UTC day
fn outgoing_today(transactions: &[Transaction], account_number: &str) -> Decimal {
    let today = Utc::now().date_naive();
    transactions
        .iter()
        .filter(|t| {
            t.tx_type.is_outgoing()
                && t.from_account == account_number
                && t.timestamp.date_naive() == today
        })
        .map(|t| t.amount)
        .sum()
}

fn unique_id(transactions: &[Transaction]) -> String {
    let taken: HashSet<&str> = transactions.iter().map(|t| t.id.as_str()).collect();
    loop {
        let id = Transaction::generate_id();
        if !taken.contains(id.as_str()) {
            return id;
        }
    }
}
