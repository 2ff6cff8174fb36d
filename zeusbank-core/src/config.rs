//! Configuration management
//!
//! Read from `config.json` in the data directory:
//! ```json
//! {
//!   "storage": "json",
//!   "propagation": "raw",
//!   "admin": { "username": "admincbl", "password": "admin123cbl$" }
//! }
//! ```
//! Keys this crate doesn't manage are preserved on save.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

pub const CONFIG_FILE: &str = "config.json";

const DEFAULT_ADMIN_USERNAME: &str = "admincbl";
const DEFAULT_ADMIN_PASSWORD: &str = "admin123cbl$";

/// Which ledger backend to open
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Json,
    Duckdb,
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(StorageBackend::Json),
            "duckdb" => Ok(StorageBackend::Duckdb),
            other => bail!("unknown storage backend '{}' (expected json or duckdb)", other),
        }
    }
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageBackend::Json => f.write_str("json"),
            StorageBackend::Duckdb => f.write_str("duckdb"),
        }
    }
}

/// How a change of default transfer/withdrawal status reaches existing records
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropagationMode {
    /// Overwrite statuses, leave balances alone
    #[default]
    Raw,
    /// Overwrite statuses and reconcile balances like an admin edit
    Reconcile,
}

impl FromStr for PropagationMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "raw" => Ok(PropagationMode::Raw),
            "reconcile" => Ok(PropagationMode::Reconcile),
            other => bail!("unknown propagation mode '{}' (expected raw or reconcile)", other),
        }
    }
}

impl fmt::Display for PropagationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropagationMode::Raw => f.write_str("raw"),
            PropagationMode::Reconcile => f.write_str("reconcile"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminCredentials {
    pub username: String,
    pub password: String,
}

impl Default for AdminCredentials {
    fn default() -> Self {
        Self {
            username: DEFAULT_ADMIN_USERNAME.to_string(),
            password: DEFAULT_ADMIN_PASSWORD.to_string(),
        }
    }
}

/// Raw config.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    #[serde(default)]
    storage: StorageBackend,
    #[serde(default)]
    propagation: PropagationMode,
    #[serde(default)]
    admin: AdminCredentials,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

/// Zeus Bank configuration
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub storage: StorageBackend,
    pub propagation: PropagationMode,
    pub admin: AdminCredentials,
    // Keep the raw file for preservation when saving
    _raw: ConfigFile,
}

impl Config {
    /// Load config from the data directory, then apply environment overrides:
    /// `ZEUSBANK_STORAGE`, `ZEUSBANK_PROPAGATION`, `ZEUSBANK_ADMIN_PASSWORD`
    pub fn load(data_dir: &Path) -> Result<Self> {
        let mut config = Self::load_file(data_dir)?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Load config.json without looking at the environment
    pub fn load_file(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(CONFIG_FILE);

        let raw: ConfigFile = if path.exists() {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("failed to parse {}", path.display()))?
        } else {
            ConfigFile::default()
        };

        Ok(Self {
            storage: raw.storage,
            propagation: raw.propagation,
            admin: raw.admin.clone(),
            _raw: raw,
        })
    }

    /// Apply overrides from a key lookup (the environment, in production)
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(storage) = lookup("ZEUSBANK_STORAGE").filter(|s| !s.is_empty()) {
            self.storage = storage.parse().context("ZEUSBANK_STORAGE")?;
        }
        if let Some(mode) = lookup("ZEUSBANK_PROPAGATION").filter(|s| !s.is_empty()) {
            self.propagation = mode.parse().context("ZEUSBANK_PROPAGATION")?;
        }
        if let Some(password) = lookup("ZEUSBANK_ADMIN_PASSWORD").filter(|s| !s.is_empty()) {
            self.admin.password = password;
        }
        Ok(())
    }

    /// Save config to the data directory, preserving keys we don't manage
    pub fn save(&self, data_dir: &Path) -> Result<()> {
        std::fs::create_dir_all(data_dir)?;
        let path = data_dir.join(CONFIG_FILE);

        let mut raw = self._raw.clone();
        raw.storage = self.storage;
        raw.propagation = self.propagation;
        raw.admin = self.admin.clone();

        let content = serde_json::to_string_pretty(&raw)?;
        std::fs::write(&path, content)
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_without_file() {
        let dir = tempdir().unwrap();
        let config = Config::load_file(dir.path()).unwrap();
        assert_eq!(config.storage, StorageBackend::Json);
        assert_eq!(config.propagation, PropagationMode::Raw);
        assert_eq!(config.admin.username, "admincbl");
    }

    #[test]
    fn test_save_preserves_unknown_keys() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            r#"{"storage":"duckdb","theme":"dark"}"#,
        )
        .unwrap();

        let mut config = Config::load_file(dir.path()).unwrap();
        assert_eq!(config.storage, StorageBackend::Duckdb);
        config.propagation = PropagationMode::Reconcile;
        config.save(dir.path()).unwrap();

        let content = std::fs::read_to_string(dir.path().join(CONFIG_FILE)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(value["theme"], "dark");
        assert_eq!(value["propagation"], "reconcile");
        assert_eq!(value["storage"], "duckdb");
    }

    #[test]
    fn test_overrides() {
        let mut config = Config::default();
        config
            .apply_overrides(|key| match key {
                "ZEUSBANK_STORAGE" => Some("DuckDB".to_string()),
                "ZEUSBANK_ADMIN_PASSWORD" => Some("hunter2".to_string()),
                _ => None,
            })
            .unwrap();
        assert_eq!(config.storage, StorageBackend::Duckdb);
        assert_eq!(config.propagation, PropagationMode::Raw);
        assert_eq!(config.admin.password, "hunter2");

        let bad = config.apply_overrides(|key| {
            (key == "ZEUSBANK_PROPAGATION").then(|| "sometimes".to_string())
        });
        assert!(bad.is_err());
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), r#"{"storage":"s3"}"#).unwrap();
        assert!(Config::load_file(dir.path()).is_err());
    }
}
