//! Account registry - in-memory working set of accounts for one operation
//!
//! Services load the registry from the repository, mutate it, and hand the
//! touched accounts back as part of a changeset. Nothing here performs I/O.

use std::collections::{BTreeSet, HashMap};

use rust_decimal::Decimal;

use super::account::{Account, AccountStatus, NewAccount};
use super::result::{Error, Result};
use super::settings::PolicySettings;
use super::transaction::{BalanceEffect, Transaction};

/// Attempts at finding an unused account number before giving up
const MAX_NUMBER_ATTEMPTS: usize = 32;

#[derive(Debug, Default)]
pub struct AccountRegistry {
    accounts: Vec<Account>,
    by_number: HashMap<String, usize>,
    dirty: BTreeSet<usize>,
}

impl AccountRegistry {
    pub fn new(accounts: Vec<Account>) -> Self {
        let by_number = accounts
            .iter()
            .enumerate()
            .map(|(i, a)| (a.account_number.clone(), i))
            .collect();
        Self {
            accounts,
            by_number,
            dirty: BTreeSet::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    pub fn accounts(&self) -> &[Account] {
        &self.accounts
    }

    pub fn contains(&self, account_number: &str) -> bool {
        self.by_number.contains_key(account_number)
    }

    pub fn find_by_number(&self, account_number: &str) -> Option<&Account> {
        self.by_number.get(account_number).map(|&i| &self.accounts[i])
    }

    pub fn find_by_id(&self, id: &str) -> Option<&Account> {
        self.accounts.iter().find(|a| a.id == id)
    }

    pub fn find_by_username(&self, username: &str) -> Option<&Account> {
        self.accounts.iter().find(|a| a.username == username)
    }

    /// Open a new account from a registration profile.
    ///
    /// Account numbers are regenerated until one is unused.
    pub fn create_account(&mut self, profile: NewAccount, policy: &PolicySettings) -> Result<&Account> {
        profile.validate()?;
        if self.find_by_username(profile.username.trim()).is_some() {
            return Err(Error::conflict("Username already exists"));
        }

        let number = (0..MAX_NUMBER_ATTEMPTS)
            .map(|_| Account::generate_number(&policy.account_number_prefix))
            .find(|n| !self.contains(n))
            .ok_or_else(|| {
                Error::conflict(format!(
                    "no free account number left under prefix {}",
                    policy.account_number_prefix
                ))
            })?;

        let account = Account::open(
            profile,
            number.clone(),
            policy.initial_balance,
            policy.default_account_status,
        );
        let index = self.accounts.len();
        self.accounts.push(account);
        self.by_number.insert(number, index);
        self.dirty.insert(index);
        Ok(&self.accounts[index])
    }

    /// Add `delta` to the balance. No lower bound is enforced here.
    pub fn apply_delta(&mut self, account_number: &str, delta: Decimal) -> Result<()> {
        let index = self.index_of(account_number)?;
        self.accounts[index].balance += delta;
        self.dirty.insert(index);
        Ok(())
    }

    /// Apply effects to every account that exists; returns how many landed
    pub fn apply_effects(&mut self, effects: &[BalanceEffect], sign: Decimal) -> usize {
        let mut applied = 0;
        for effect in effects {
            if let Some(&index) = self.by_number.get(&effect.account_number) {
                self.accounts[index].balance += effect.delta * sign;
                self.dirty.insert(index);
                applied += 1;
            }
        }
        applied
    }

    /// Move balances from `before`'s effect to `after`'s.
    ///
    /// The old effect is undone if `before` had it booked, the new one
    /// applied if `after` does. Accounts that no longer exist are skipped.
    pub fn reconcile(&mut self, before: &Transaction, after: &Transaction) {
        self.apply_effects(&before.current_effects(), Decimal::NEGATIVE_ONE);
        self.apply_effects(&after.current_effects(), Decimal::ONE);
    }

    pub fn set_status(&mut self, account_number: &str, status: AccountStatus) -> Result<()> {
        let index = self.index_of(account_number)?;
        self.accounts[index].status = status;
        self.dirty.insert(index);
        Ok(())
    }

    /// Set every account's status, unconditionally
    pub fn bulk_set_status(&mut self, status: AccountStatus) -> usize {
        for (index, account) in self.accounts.iter_mut().enumerate() {
            account.status = status;
            self.dirty.insert(index);
        }
        self.accounts.len()
    }

    /// Mutable access by owner id, marking the account dirty
    pub fn get_mut_by_id(&mut self, id: &str) -> Option<&mut Account> {
        let index = self.accounts.iter().position(|a| a.id == id)?;
        self.dirty.insert(index);
        Some(&mut self.accounts[index])
    }

    /// Accounts modified since the registry was loaded
    pub fn take_dirty(&mut self) -> Vec<Account> {
        let dirty = std::mem::take(&mut self.dirty);
        dirty.into_iter().map(|i| self.accounts[i].clone()).collect()
    }

    fn index_of(&self, account_number: &str) -> Result<usize> {
        self.by_number
            .get(account_number)
            .copied()
            .ok_or_else(|| Error::account_not_found(account_number))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(username: &str) -> NewAccount {
        NewAccount {
            full_name: "Test User".to_string(),
            email: format!("{}@example.com", username),
            phone: Some("555-0100".to_string()),
            username: username.to_string(),
            password: "pw".to_string(),
        }
    }

    #[test]
    fn test_create_account_uses_policy() {
        let mut registry = AccountRegistry::default();
        let policy = PolicySettings {
            initial_balance: Decimal::new(25, 0),
            account_number_prefix: "9900".to_string(),
            default_account_status: AccountStatus::Active,
            ..Default::default()
        };

        let account = registry.create_account(profile("alice"), &policy).unwrap();
        assert!(account.account_number.starts_with("9900"));
        assert_eq!(account.balance, Decimal::new(25, 0));
        assert_eq!(account.status, AccountStatus::Active);
        assert_eq!(account.phone, "555-0100");
        assert_eq!(registry.take_dirty().len(), 1);
    }

    #[test]
    fn test_duplicate_username_conflicts() {
        let mut registry = AccountRegistry::default();
        let policy = PolicySettings::default();
        registry.create_account(profile("bob"), &policy).unwrap();
        let err = registry.create_account(profile("bob"), &policy).unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[test]
    fn test_account_numbers_are_unique() {
        let mut registry = AccountRegistry::default();
        let policy = PolicySettings::default();
        for i in 0..200 {
            registry.create_account(profile(&format!("user{}", i)), &policy).unwrap();
        }
        let numbers: BTreeSet<_> = registry.accounts().iter().map(|a| &a.account_number).collect();
        assert_eq!(numbers.len(), 200);
    }

    #[test]
    fn test_apply_delta_allows_overdraft() {
        let mut registry = AccountRegistry::default();
        let number = registry
            .create_account(profile("carol"), &PolicySettings::default())
            .unwrap()
            .account_number
            .clone();
        registry.take_dirty();

        registry.apply_delta(&number, Decimal::new(-10, 0)).unwrap();
        assert_eq!(registry.find_by_number(&number).unwrap().balance, Decimal::new(-10, 0));
        assert!(registry.apply_delta("nope", Decimal::ONE).is_err());
        assert_eq!(registry.take_dirty().len(), 1);
    }

    #[test]
    fn test_apply_effects_skips_unknown_accounts() {
        let mut registry = AccountRegistry::default();
        let number = registry
            .create_account(profile("dave"), &PolicySettings::default())
            .unwrap()
            .account_number
            .clone();
        let effects = vec![
            BalanceEffect { account_number: number.clone(), delta: Decimal::new(5, 0) },
            BalanceEffect { account_number: "EXTERNAL".to_string(), delta: Decimal::new(-5, 0) },
        ];
        assert_eq!(registry.apply_effects(&effects, Decimal::ONE), 1);
        assert_eq!(registry.find_by_number(&number).unwrap().balance, Decimal::new(5, 0));
    }

    #[test]
    fn test_reconcile_status_and_amount_changes() {
        use crate::domain::{TransactionStatus, TransactionType};

        let mut registry = AccountRegistry::default();
        let policy = PolicySettings::default();
        let from = registry.create_account(profile("gina"), &policy).unwrap().account_number.clone();
        let to = registry.create_account(profile("hank"), &policy).unwrap().account_number.clone();

        let pending = Transaction::new(
            Transaction::generate_id(),
            from.clone(),
            to.clone(),
            Decimal::new(30, 0),
            TransactionType::Transfer,
            TransactionStatus::Pending,
            "",
        );
        let mut approved = pending.clone();
        approved.status = TransactionStatus::Successful;
        registry.reconcile(&pending, &approved);
        assert_eq!(registry.find_by_number(&from).unwrap().balance, Decimal::new(-30, 0));
        assert_eq!(registry.find_by_number(&to).unwrap().balance, Decimal::new(30, 0));

        let mut larger = approved.clone();
        larger.amount = Decimal::new(45, 0);
        registry.reconcile(&approved, &larger);
        assert_eq!(registry.find_by_number(&from).unwrap().balance, Decimal::new(-45, 0));
        assert_eq!(registry.find_by_number(&to).unwrap().balance, Decimal::new(45, 0));

        // pending -> pending moves nothing
        let mut still_pending = pending.clone();
        still_pending.amount = Decimal::new(99, 0);
        registry.reconcile(&pending, &still_pending);
        assert_eq!(registry.find_by_number(&to).unwrap().balance, Decimal::new(45, 0));
    }

    #[test]
    fn test_bulk_set_status() {
        let mut registry = AccountRegistry::default();
        let policy = PolicySettings::default();
        registry.create_account(profile("erin"), &policy).unwrap();
        registry.create_account(profile("frank"), &policy).unwrap();
        registry.take_dirty();

        assert_eq!(registry.bulk_set_status(AccountStatus::Suspended), 2);
        assert!(registry.accounts().iter().all(|a| a.status == AccountStatus::Suspended));
        assert_eq!(registry.take_dirty().len(), 2);
    }
}
