//! DuckDB repository implementation
//!
//! Transactional alternative to the JSON documents: every changeset is
//! applied inside one SQL transaction, so a failure part-way leaves the
//! database untouched.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use chrono::{DateTime, Utc};
use duckdb::{params, Connection};
use rust_decimal::Decimal;

use crate::domain::result::{Error, Result};
use crate::domain::{
    Account, AccountStatus, FundingRecord, PolicySettings, Transaction, TransactionStatus,
    TransactionType,
};
use crate::ports::{Changeset, LedgerRepository};
use crate::services::{MigrationResult, MigrationService};

/// Maximum number of retries when database file is locked
const MAX_RETRIES: u32 = 5;

/// Initial retry delay in milliseconds (doubles each retry: 50, 100, 200, 400, 800ms)
const INITIAL_RETRY_DELAY_MS: u64 = 50;

/// Key of the policy row in sys_settings
const POLICY_KEY: &str = "policy";

/// Check if an error message indicates a file locking issue that should be retried
fn is_retryable_error(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    // Windows error messages
    lower.contains("being used by another process")
        || lower.contains("cannot access the file")
        // Unix/macOS error messages
        || lower.contains("resource temporarily unavailable")
        || lower.contains("database is locked")
        || lower.contains("file is already open")
        || lower.contains("could not set lock")
}

/// DuckDB repository implementation
pub struct DuckDbRepository {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl DuckDbRepository {
    /// Open (or create) the ledger database at `db_path`.
    ///
    /// Includes retry logic with exponential backoff for file locking errors,
    /// which occur when another process holds the database open.
    pub fn new(db_path: &Path) -> Result<Self> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            match Self::try_open_connection(db_path) {
                Ok(conn) => {
                    return Ok(Self {
                        conn: Mutex::new(conn),
                        db_path: db_path.to_path_buf(),
                    });
                }
                Err(e) => {
                    let err_msg = e.to_string();
                    if is_retryable_error(&err_msg) && attempt < MAX_RETRIES - 1 {
                        let delay =
                            Duration::from_millis(INITIAL_RETRY_DELAY_MS * 2u64.pow(attempt));
                        eprintln!(
                            "[zeusbank] Database busy, retrying in {}ms (attempt {}/{}): {}",
                            delay.as_millis(),
                            attempt + 1,
                            MAX_RETRIES,
                            err_msg
                        );
                        thread::sleep(delay);
                        last_error = Some(e);
                        continue;
                    }
                    return Err(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            Error::database(format!("Failed to open database after {} retries", MAX_RETRIES))
        }))
    }

    fn try_open_connection(db_path: &Path) -> Result<Connection> {
        // Extension autoloading stays off; JSON is linked statically via the crate feature
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        Ok(Connection::open_with_flags(db_path, config)?)
    }

    /// Run database migrations using the MigrationService
    pub fn run_migrations(&self) -> Result<MigrationResult> {
        let conn = self.conn()?;
        MigrationService::new(&conn).run_pending()
    }

    /// Ensure database schema exists (runs pending migrations)
    pub fn ensure_schema(&self) -> Result<()> {
        self.run_migrations()?;
        Ok(())
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| Error::database(format!("Lock poisoned: {}", e)))
    }
}

impl LedgerRepository for DuckDbRepository {
    fn get_accounts(&self) -> Result<Vec<Account>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT account_id, full_name, email, phone, username, password, account_number,
                    CAST(balance AS VARCHAR), status, created_at
             FROM sys_accounts
             ORDER BY seq",
        )?;

        let rows = stmt
            .query_map([], |row| {
                Ok(AccountRow {
                    id: row.get(0)?,
                    full_name: row.get(1)?,
                    email: row.get(2)?,
                    phone: row.get(3)?,
                    username: row.get(4)?,
                    password: row.get(5)?,
                    account_number: row.get(6)?,
                    balance: row.get(7)?,
                    status: row.get(8)?,
                    created_at: row.get(9)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter().map(AccountRow::into_account).collect()
    }

    fn get_transactions(&self) -> Result<Vec<Transaction>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT transaction_id, from_account, to_account, CAST(amount AS VARCHAR),
                    tx_type, status, memo, tx_date, balance_applied
             FROM sys_transactions
             ORDER BY seq",
        )?;

        let rows = stmt
            .query_map([], |row| {
                Ok(TransactionRow {
                    id: row.get(0)?,
                    from_account: row.get(1)?,
                    to_account: row.get(2)?,
                    amount: row.get(3)?,
                    tx_type: row.get(4)?,
                    status: row.get(5)?,
                    memo: row.get(6)?,
                    date: row.get(7)?,
                    balance_applied: row.get(8)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter().map(TransactionRow::into_transaction).collect()
    }

    fn get_transaction(&self, id: &str) -> Result<Option<Transaction>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT transaction_id, from_account, to_account, CAST(amount AS VARCHAR),
                    tx_type, status, memo, tx_date, balance_applied
             FROM sys_transactions
             WHERE transaction_id = ?",
        )?;

        let mut rows = stmt.query_map([id], |row| {
            Ok(TransactionRow {
                id: row.get(0)?,
                from_account: row.get(1)?,
                to_account: row.get(2)?,
                amount: row.get(3)?,
                tx_type: row.get(4)?,
                status: row.get(5)?,
                memo: row.get(6)?,
                date: row.get(7)?,
                balance_applied: row.get(8)?,
            })
        })?;

        match rows.next() {
            Some(row) => Ok(Some(row?.into_transaction()?)),
            None => Ok(None),
        }
    }

    fn get_settings(&self) -> Result<PolicySettings> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT setting_value FROM sys_settings WHERE setting_key = ?")?;
        let mut rows = stmt.query_map([POLICY_KEY], |row| row.get::<_, String>(0))?;

        match rows.next() {
            Some(value) => Ok(serde_json::from_str(&value?)?),
            None => Ok(PolicySettings::default()),
        }
    }

    fn get_funding_history(&self) -> Result<Vec<FundingRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT funding_date, account_number, CAST(amount AS VARCHAR), description
             FROM sys_funding_history
             ORDER BY seq",
        )?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(date, account_number, amount, description)| {
                Ok(FundingRecord {
                    date: parse_timestamp(&date)?,
                    account_number,
                    amount: parse_decimal(&amount)?,
                    description,
                })
            })
            .collect()
    }

    fn commit(&self, changes: Changeset) -> Result<()> {
        if changes.is_empty() {
            return Ok(());
        }

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        for account in &changes.upsert_accounts {
            tx.execute(
                "INSERT INTO sys_accounts (account_id, full_name, email, phone, username, password,
                                           account_number, balance, status, created_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, CAST(? AS DECIMAL(38, 18)), ?, ?)
                 ON CONFLICT (account_id) DO UPDATE SET
                    full_name = EXCLUDED.full_name,
                    email = EXCLUDED.email,
                    phone = EXCLUDED.phone,
                    username = EXCLUDED.username,
                    password = EXCLUDED.password,
                    account_number = EXCLUDED.account_number,
                    balance = EXCLUDED.balance,
                    status = EXCLUDED.status",
                params![
                    account.id,
                    account.full_name,
                    account.email,
                    account.phone,
                    account.username,
                    account.password,
                    account.account_number,
                    account.balance.to_string(),
                    account.status.as_str(),
                    account.created_at.to_rfc3339(),
                ],
            )?;
        }

        for id in &changes.delete_accounts {
            tx.execute("DELETE FROM sys_accounts WHERE account_id = ?", params![id])?;
        }

        for t in &changes.upsert_transactions {
            tx.execute(
                "INSERT INTO sys_transactions (transaction_id, from_account, to_account, amount,
                                               tx_type, status, memo, tx_date, balance_applied)
                 VALUES (?, ?, ?, CAST(? AS DECIMAL(38, 18)), ?, ?, ?, ?, ?)
                 ON CONFLICT (transaction_id) DO UPDATE SET
                    amount = EXCLUDED.amount,
                    tx_type = EXCLUDED.tx_type,
                    status = EXCLUDED.status,
                    memo = EXCLUDED.memo,
                    balance_applied = EXCLUDED.balance_applied",
                params![
                    t.id,
                    t.from_account,
                    t.to_account,
                    t.amount.to_string(),
                    t.tx_type.as_str(),
                    t.status.as_str(),
                    t.memo,
                    t.timestamp.to_rfc3339(),
                    t.balance_applied,
                ],
            )?;
        }

        for id in &changes.delete_transactions {
            tx.execute("DELETE FROM sys_transactions WHERE transaction_id = ?", params![id])?;
        }

        if let Some(settings) = &changes.settings {
            let value = serde_json::to_string(settings)?;
            tx.execute(
                "INSERT INTO sys_settings (setting_key, setting_value) VALUES (?, ?)
                 ON CONFLICT (setting_key) DO UPDATE SET setting_value = EXCLUDED.setting_value",
                params![POLICY_KEY, value],
            )?;
        }

        for record in &changes.append_funding {
            tx.execute(
                "INSERT INTO sys_funding_history (funding_date, account_number, amount, description)
                 VALUES (?, ?, CAST(? AS DECIMAL(38, 18)), ?)",
                params![
                    record.date.to_rfc3339(),
                    record.account_number,
                    record.amount.to_string(),
                    record.description,
                ],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "duckdb"
    }
}

struct AccountRow {
    id: String,
    full_name: String,
    email: String,
    phone: String,
    username: String,
    password: String,
    account_number: String,
    balance: String,
    status: String,
    created_at: String,
}

impl AccountRow {
    fn into_account(self) -> Result<Account> {
        Ok(Account {
            id: self.id,
            full_name: self.full_name,
            email: self.email,
            phone: self.phone,
            username: self.username,
            password: self.password,
            account_number: self.account_number,
            balance: parse_decimal(&self.balance)?,
            status: AccountStatus::from_str(&self.status)?,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}

struct TransactionRow {
    id: String,
    from_account: String,
    to_account: String,
    amount: String,
    tx_type: String,
    status: String,
    memo: String,
    date: String,
    balance_applied: Option<bool>,
}

impl TransactionRow {
    fn into_transaction(self) -> Result<Transaction> {
        Ok(Transaction {
            id: self.id,
            from_account: self.from_account,
            to_account: self.to_account,
            amount: parse_decimal(&self.amount)?,
            tx_type: TransactionType::from_str(&self.tx_type)?,
            status: TransactionStatus::from_str(&self.status)?,
            memo: self.memo,
            timestamp: parse_timestamp(&self.date)?,
            balance_applied: self.balance_applied,
        })
    }
}

// Helper functions

fn parse_decimal(s: &str) -> Result<Decimal> {
    Decimal::from_str(s.trim())
        .map(|d| d.normalize())
        .map_err(|e| Error::database(format!("invalid decimal '{}': {}", s, e)))
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::database(format!("invalid timestamp '{}': {}", s, e)))
}
