//! Core domain entities
//!
//! All business entities are defined here. These are pure data structures
//! with validation logic - no I/O or external dependencies.

mod account;
mod funding;
pub mod registry;
pub mod result;
mod settings;
mod transaction;

pub use account::{Account, AccountProfile, AccountStatus, NewAccount};
pub use funding::FundingRecord;
pub use registry::AccountRegistry;
pub use settings::{PolicySettings, SettingsPatch};
pub use transaction::{
    sort_newest_first, BalanceEffect, Transaction, TransactionStatus, TransactionType,
    ADMIN_ACCOUNT, EXTERNAL_ACCOUNT,
};
