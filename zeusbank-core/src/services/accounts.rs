//! Account service - registration, login and account administration

use std::sync::{Arc, Mutex};

use rust_decimal::Decimal;
use serde::Serialize;

use super::lock_ledger;
use crate::config::AdminCredentials;
use crate::domain::result::{Error, Result};
use crate::domain::{Account, AccountProfile, AccountRegistry, AccountStatus, NewAccount};
use crate::ports::{Changeset, LedgerRepository};

/// Who a successful login belongs to
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Session {
    Admin { username: String },
    Customer { user: AccountProfile },
}

/// Admin edit of an account. Absent fields are left alone.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub status: Option<AccountStatus>,
    /// Overwrites the balance without booking a transaction
    pub balance: Option<Decimal>,
}

/// Customer edit of their own profile
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub username: Option<String>,
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

pub struct AccountService {
    repository: Arc<dyn LedgerRepository>,
    lock: Arc<Mutex<()>>,
    admin: AdminCredentials,
}

impl AccountService {
    pub fn new(
        repository: Arc<dyn LedgerRepository>,
        lock: Arc<Mutex<()>>,
        admin: AdminCredentials,
    ) -> Self {
        Self { repository, lock, admin }
    }

    /// Open an account under the current policy
    pub fn register(&self, profile: NewAccount) -> Result<AccountProfile> {
        profile.validate()?;
        if profile.username.trim() == self.admin.username {
            return Err(Error::conflict("Username already exists"));
        }

        let _guard = lock_ledger(&self.lock)?;
        let policy = self.repository.get_settings()?;
        let mut registry = AccountRegistry::new(self.repository.get_accounts()?);
        let created = registry.create_account(profile, &policy)?.profile();

        self.repository.commit(Changeset {
            upsert_accounts: registry.take_dirty(),
            ..Default::default()
        })?;

        Ok(created)
    }

    /// Configured admin credentials win; otherwise match a customer verbatim
    pub fn login(&self, username: &str, password: &str) -> Result<Session> {
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            return Err(Error::validation("Username and password are required"));
        }
        if username == self.admin.username && password == self.admin.password {
            return Ok(Session::Admin {
                username: username.to_string(),
            });
        }

        self.repository
            .get_accounts()?
            .iter()
            .find(|a| a.username == username && a.password == password)
            .map(|a| Session::Customer { user: a.profile() })
            .ok_or_else(|| Error::unauthorized("Invalid username or password"))
    }

    pub fn get_user(&self, id: &str) -> Result<AccountProfile> {
        self.repository
            .get_account_by_id(id)?
            .map(|a| a.profile())
            .ok_or_else(|| user_not_found(id))
    }

    pub fn get_by_number(&self, account_number: &str) -> Result<AccountProfile> {
        self.repository
            .get_account_by_number(account_number)?
            .map(|a| a.profile())
            .ok_or_else(|| Error::account_not_found(account_number))
    }

    /// All accounts in registration order, optionally by status
    pub fn list_users(&self, status: Option<AccountStatus>) -> Result<Vec<AccountProfile>> {
        Ok(self
            .repository
            .get_accounts()?
            .iter()
            .filter(|a| status.map_or(true, |s| a.status == s))
            .map(Account::profile)
            .collect())
    }

    pub fn update_user(&self, id: &str, update: UserUpdate) -> Result<AccountProfile> {
        let full_name = non_blank("fullName", update.full_name)?;
        let email = non_blank("email", update.email)?;

        let _guard = lock_ledger(&self.lock)?;
        let mut registry = AccountRegistry::new(self.repository.get_accounts()?);
        let account = registry.get_mut_by_id(id).ok_or_else(|| user_not_found(id))?;

        if let Some(v) = full_name {
            account.full_name = v;
        }
        if let Some(v) = email {
            account.email = v;
        }
        if let Some(v) = update.phone {
            account.phone = v.trim().to_string();
        }
        if let Some(v) = update.status {
            account.status = v;
        }
        if let Some(v) = update.balance {
            account.balance = v;
        }
        let updated = account.profile();

        self.repository.commit(Changeset {
            upsert_accounts: registry.take_dirty(),
            ..Default::default()
        })?;
        Ok(updated)
    }

    pub fn set_status(&self, account_number: &str, status: AccountStatus) -> Result<AccountProfile> {
        let _guard = lock_ledger(&self.lock)?;
        let mut registry = AccountRegistry::new(self.repository.get_accounts()?);
        registry.set_status(account_number, status)?;
        let updated = registry.take_dirty();
        let profile = updated
            .first()
            .map(Account::profile)
            .ok_or_else(|| Error::account_not_found(account_number))?;

        self.repository.commit(Changeset {
            upsert_accounts: updated,
            ..Default::default()
        })?;
        Ok(profile)
    }

    /// Remove the account. Its transactions stay in the log untouched.
    pub fn delete_user(&self, id: &str) -> Result<AccountProfile> {
        let _guard = lock_ledger(&self.lock)?;
        let account = self
            .repository
            .get_account_by_id(id)?
            .ok_or_else(|| user_not_found(id))?;

        self.repository.commit(Changeset {
            delete_accounts: vec![account.id.clone()],
            ..Default::default()
        })?;
        Ok(account.profile())
    }

    /// Self-service edit. Changing the password needs the current one.
    pub fn update_profile(&self, id: &str, update: ProfileUpdate) -> Result<AccountProfile> {
        let full_name = non_blank("fullName", update.full_name)?;
        let email = non_blank("email", update.email)?;
        let username = non_blank("username", update.username)?;
        let new_password = non_blank("newPassword", update.new_password)?;

        let _guard = lock_ledger(&self.lock)?;
        let mut registry = AccountRegistry::new(self.repository.get_accounts()?);

        if let Some(name) = &username {
            let taken = registry
                .find_by_username(name)
                .is_some_and(|other| other.id != id);
            if taken || *name == self.admin.username {
                return Err(Error::conflict("Username already exists"));
            }
        }

        let account = registry.get_mut_by_id(id).ok_or_else(|| user_not_found(id))?;
        if let Some(password) = new_password {
            if update.current_password.as_deref() != Some(account.password.as_str()) {
                return Err(Error::unauthorized("Current password is incorrect"));
            }
            account.password = password;
        }
        if let Some(v) = full_name {
            account.full_name = v;
        }
        if let Some(v) = email {
            account.email = v;
        }
        if let Some(v) = update.phone {
            account.phone = v.trim().to_string();
        }
        if let Some(v) = username {
            account.username = v;
        }
        let updated = account.profile();

        self.repository.commit(Changeset {
            upsert_accounts: registry.take_dirty(),
            ..Default::default()
        })?;
        Ok(updated)
    }
}

fn user_not_found(id: &str) -> Error {
    Error::not_found(format!("user {}", id))
}

/// Trimmed value, rejecting a present-but-blank field
fn non_blank(field: &str, value: Option<String>) -> Result<Option<String>> {
    match value {
        Some(v) if v.trim().is_empty() => {
            Err(Error::validation(format!("{} cannot be empty", field)))
        }
        Some(v) => Ok(Some(v.trim().to_string())),
        None => Ok(None),
    }
}
