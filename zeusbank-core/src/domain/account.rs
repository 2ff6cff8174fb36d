//! Account domain model

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::result::{Error, Result};

/// Lifecycle status of an account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    Active,
    Pending,
    Suspended,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Active => "active",
            AccountStatus::Pending => "pending",
            AccountStatus::Suspended => "suspended",
        }
    }
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "active" => Ok(AccountStatus::Active),
            "pending" => Ok(AccountStatus::Pending),
            "suspended" => Ok(AccountStatus::Suspended),
            other => Err(Error::validation(format!("unknown account status: {}", other))),
        }
    }
}

/// A customer account. The owner's profile lives on the same record, so the
/// account `id` doubles as the owner reference.
///
/// Passwords are stored as given; never hand this struct to a caller, use
/// [`AccountProfile`] instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: String,
    pub full_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    pub username: String,
    pub password: String,
    pub account_number: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub balance: Decimal,
    pub status: AccountStatus,
    pub created_at: DateTime<Utc>,
}

/// Registration input
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAccount {
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl NewAccount {
    /// All fields except phone are required
    pub fn validate(&self) -> Result<()> {
        let missing: Vec<&str> = [
            ("fullName", &self.full_name),
            ("email", &self.email),
            ("username", &self.username),
            ("password", &self.password),
        ]
        .iter()
        .filter(|(_, v)| v.trim().is_empty())
        .map(|(k, _)| *k)
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::validation(format!(
                "Missing required fields: {}",
                missing.join(", ")
            )))
        }
    }
}

/// Account as shown to callers: everything but the password
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountProfile {
    pub id: String,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub username: String,
    pub account_number: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub balance: Decimal,
    pub status: AccountStatus,
    pub created_at: DateTime<Utc>,
}

impl From<&Account> for AccountProfile {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id.clone(),
            full_name: account.full_name.clone(),
            email: account.email.clone(),
            phone: account.phone.clone(),
            username: account.username.clone(),
            account_number: account.account_number.clone(),
            balance: account.balance,
            status: account.status,
            created_at: account.created_at,
        }
    }
}

impl Account {
    /// Build an account from a registration profile
    pub fn open(
        profile: NewAccount,
        account_number: String,
        initial_balance: Decimal,
        status: AccountStatus,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            full_name: profile.full_name.trim().to_string(),
            email: profile.email.trim().to_string(),
            phone: profile.phone.unwrap_or_default(),
            username: profile.username.trim().to_string(),
            password: profile.password,
            account_number,
            balance: initial_balance,
            status,
            created_at: Utc::now(),
        }
    }

    pub fn profile(&self) -> AccountProfile {
        AccountProfile::from(self)
    }

    /// Generate a candidate account number: prefix + 4 random digits (1000-9999)
    pub fn generate_number(prefix: &str) -> String {
        let suffix: u32 = rand::thread_rng().gen_range(1000..10000);
        format!("{}{}", prefix, suffix)
    }
}
