//! Repository port - storage abstraction for the ledger

use crate::domain::result::Result;
use crate::domain::{Account, FundingRecord, PolicySettings, Transaction};

/// Ledger storage abstraction
///
/// Reads return owned snapshots. Writes go through [`Changeset`], which an
/// implementation must apply all-or-nothing.
pub trait LedgerRepository: Send + Sync {
    // === Accounts ===

    /// Get all accounts, in registration order
    fn get_accounts(&self) -> Result<Vec<Account>>;

    /// Get account by account number
    fn get_account_by_number(&self, account_number: &str) -> Result<Option<Account>> {
        Ok(self
            .get_accounts()?
            .into_iter()
            .find(|a| a.account_number == account_number))
    }

    /// Get account by owner id
    fn get_account_by_id(&self, id: &str) -> Result<Option<Account>> {
        Ok(self.get_accounts()?.into_iter().find(|a| a.id == id))
    }

    // === Transactions ===

    /// Get every canonical transaction, in insertion order
    fn get_transactions(&self) -> Result<Vec<Transaction>>;

    /// Get a transaction by id
    fn get_transaction(&self, id: &str) -> Result<Option<Transaction>> {
        Ok(self.get_transactions()?.into_iter().find(|t| t.id == id))
    }

    // === Settings ===

    fn get_settings(&self) -> Result<PolicySettings>;

    // === Funding history ===

    fn get_funding_history(&self) -> Result<Vec<FundingRecord>>;

    // === Writes ===

    /// Apply a set of changes atomically
    fn commit(&self, changes: Changeset) -> Result<()>;

    /// Human-readable backend name
    fn backend(&self) -> &'static str;
}

/// A batch of writes produced by one ledger operation
#[derive(Debug, Clone, Default)]
pub struct Changeset {
    /// Accounts to insert or replace (matched by id)
    pub upsert_accounts: Vec<Account>,
    /// Owner ids of accounts to remove
    pub delete_accounts: Vec<String>,
    /// Transactions to insert or replace (matched by id)
    pub upsert_transactions: Vec<Transaction>,
    /// Ids of transactions to remove
    pub delete_transactions: Vec<String>,
    /// New settings singleton
    pub settings: Option<PolicySettings>,
    /// Records appended to the funding history
    pub append_funding: Vec<FundingRecord>,
}

impl Changeset {
    pub fn is_empty(&self) -> bool {
        self.upsert_accounts.is_empty()
            && self.delete_accounts.is_empty()
            && self.upsert_transactions.is_empty()
            && self.delete_transactions.is_empty()
            && self.settings.is_none()
            && self.append_funding.is_empty()
    }

    pub fn touches_accounts(&self) -> bool {
        !self.upsert_accounts.is_empty() || !self.delete_accounts.is_empty()
    }

    pub fn touches_transactions(&self) -> bool {
        !self.upsert_transactions.is_empty() || !self.delete_transactions.is_empty()
    }
}
