//! JSON file repository implementation
//!
//! State lives in four documents inside the data directory:
//! `users.json`, `transactions.json`, `adminSettings.json` and
//! `fundingHistory.json`. A commit rewrites every document it touches in
//! full. All touched documents are staged as temp files first and only then
//! renamed into place; if a rename fails, the documents already replaced
//! are written back from the previous state.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use fs2::FileExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tempfile::NamedTempFile;

use crate::domain::result::{Error, Result};
use crate::domain::{Account, FundingRecord, PolicySettings, Transaction};
use crate::ports::{Changeset, LedgerRepository};

pub const USERS_FILE: &str = "users.json";
pub const TRANSACTIONS_FILE: &str = "transactions.json";
pub const SETTINGS_FILE: &str = "adminSettings.json";
pub const FUNDING_FILE: &str = "fundingHistory.json";
const LOCK_FILE: &str = ".lock";

/// Maximum number of attempts at taking the data directory lock
const MAX_RETRIES: u32 = 5;

/// Initial retry delay in milliseconds (doubles each retry: 50, 100, 200, 400ms)
const INITIAL_RETRY_DELAY_MS: u64 = 50;

#[derive(Debug, Clone, Default)]
struct LedgerState {
    accounts: Vec<Account>,
    transactions: Vec<Transaction>,
    settings: PolicySettings,
    funding: Vec<FundingRecord>,
}

/// Flat-file repository holding the whole ledger in memory
pub struct JsonFileRepository {
    data_dir: PathBuf,
    state: Mutex<LedgerState>,
    // Held for the repository's lifetime; the OS releases the lock on drop
    _lock: File,
}

impl JsonFileRepository {
    /// Open (or create) a ledger in `data_dir`.
    ///
    /// Takes an exclusive lock on the directory, retrying with exponential
    /// backoff while another process holds it.
    pub fn open(data_dir: &Path) -> Result<Self> {
        fs::create_dir_all(data_dir)?;
        let lock = Self::acquire_lock(&data_dir.join(LOCK_FILE))?;

        let state = LedgerState {
            accounts: read_document(&data_dir.join(USERS_FILE))?.unwrap_or_default(),
            transactions: read_document(&data_dir.join(TRANSACTIONS_FILE))?.unwrap_or_default(),
            settings: read_document(&data_dir.join(SETTINGS_FILE))?.unwrap_or_default(),
            funding: read_document(&data_dir.join(FUNDING_FILE))?.unwrap_or_default(),
        };

        Ok(Self {
            data_dir: data_dir.to_path_buf(),
            state: Mutex::new(state),
            _lock: lock,
        })
    }

    fn acquire_lock(path: &Path) -> Result<File> {
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(path)?;

        for attempt in 0..MAX_RETRIES {
            match file.try_lock_exclusive() {
                Ok(()) => return Ok(file),
                Err(e) if attempt < MAX_RETRIES - 1 => {
                    let delay = Duration::from_millis(INITIAL_RETRY_DELAY_MS * 2u64.pow(attempt));
                    eprintln!(
                        "[zeusbank] Data directory busy, retrying in {}ms (attempt {}/{}): {}",
                        delay.as_millis(),
                        attempt + 1,
                        MAX_RETRIES,
                        e
                    );
                    thread::sleep(delay);
                }
                Err(e) => {
                    return Err(Error::database(format!(
                        "data directory {} is locked by another process: {}",
                        path.parent().unwrap_or(path).display(),
                        e
                    )));
                }
            }
        }

        Err(Error::database(format!(
            "failed to lock data directory after {} retries",
            MAX_RETRIES
        )))
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Write `names` back from `previous` after a partially applied commit
    fn restore(&self, previous: &LedgerState, names: &[&str]) {
        for name in names {
            let restored = match *name {
                USERS_FILE => write_document(&self.data_dir, name, &previous.accounts),
                TRANSACTIONS_FILE => write_document(&self.data_dir, name, &previous.transactions),
                SETTINGS_FILE => write_document(&self.data_dir, name, &previous.settings),
                _ => write_document(&self.data_dir, name, &previous.funding),
            };
            if let Err(e) = restored {
                eprintln!("[zeusbank] Failed to restore {} after aborted commit: {}", name, e);
            }
        }
    }

    fn state(&self) -> Result<MutexGuard<'_, LedgerState>> {
        self.state
            .lock()
            .map_err(|e| Error::database(format!("Lock poisoned: {}", e)))
    }
}

impl LedgerRepository for JsonFileRepository {
    fn get_accounts(&self) -> Result<Vec<Account>> {
        Ok(self.state()?.accounts.clone())
    }

    fn get_transactions(&self) -> Result<Vec<Transaction>> {
        Ok(self.state()?.transactions.clone())
    }

    fn get_settings(&self) -> Result<PolicySettings> {
        Ok(self.state()?.settings.clone())
    }

    fn get_funding_history(&self) -> Result<Vec<FundingRecord>> {
        Ok(self.state()?.funding.clone())
    }

    fn commit(&self, changes: Changeset) -> Result<()> {
        if changes.is_empty() {
            return Ok(());
        }

        let mut state = self.state()?;

        // Work on a copy so a failed write leaves memory matching disk
        let mut next = state.clone();

        for account in &changes.upsert_accounts {
            match next.accounts.iter_mut().find(|a| a.id == account.id) {
                Some(existing) => *existing = account.clone(),
                None => next.accounts.push(account.clone()),
            }
        }
        next.accounts.retain(|a| !changes.delete_accounts.contains(&a.id));

        for tx in &changes.upsert_transactions {
            match next.transactions.iter_mut().find(|t| t.id == tx.id) {
                Some(existing) => *existing = tx.clone(),
                None => next.transactions.push(tx.clone()),
            }
        }
        next.transactions
            .retain(|t| !changes.delete_transactions.contains(&t.id));

        if let Some(settings) = &changes.settings {
            next.settings = settings.clone();
        }
        next.funding.extend(changes.append_funding.iter().cloned());

        let mut staged = Vec::new();
        if changes.touches_accounts() {
            staged.push((USERS_FILE, stage_document(&self.data_dir, &next.accounts)?));
        }
        if changes.touches_transactions() {
            staged.push((TRANSACTIONS_FILE, stage_document(&self.data_dir, &next.transactions)?));
        }
        if changes.settings.is_some() {
            staged.push((SETTINGS_FILE, stage_document(&self.data_dir, &next.settings)?));
        }
        if !changes.append_funding.is_empty() {
            staged.push((FUNDING_FILE, stage_document(&self.data_dir, &next.funding)?));
        }

        let mut replaced = Vec::new();
        for (name, tmp) in staged {
            if let Err(e) = tmp.persist(self.data_dir.join(name)) {
                self.restore(&state, &replaced);
                return Err(Error::Io(e.error));
            }
            replaced.push(name);
        }

        *state = next;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "json"
    }
}

fn read_document<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    if content.trim().is_empty() {
        return Ok(None);
    }
    let value = serde_json::from_str(&content).map_err(|e| {
        Error::database(format!("failed to parse {}: {}", path.display(), e))
    })?;
    Ok(Some(value))
}

/// Serialize `value` into a synced temp file next to its target
fn stage_document<T: Serialize>(dir: &Path, value: &T) -> Result<NamedTempFile> {
    let tmp = NamedTempFile::new_in(dir)?;
    {
        let mut writer = BufWriter::new(tmp.as_file());
        serde_json::to_writer_pretty(&mut writer, value)?;
        writer.flush()?;
    }
    tmp.as_file().sync_all()?;
    Ok(tmp)
}

fn write_document<T: Serialize>(dir: &Path, name: &str, value: &T) -> Result<()> {
    stage_document(dir, value)?
        .persist(dir.join(name))
        .map_err(|e| Error::Io(e.error))?;
    Ok(())
}
