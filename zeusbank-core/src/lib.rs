//! Zeus Bank Core - ledger engine for the Zeus Bank demo
//!
//! This crate implements the core domain logic following hexagonal architecture:
//!
//! - **domain**: Core business entities (Account, Transaction, PolicySettings, etc.)
//! - **ports**: Trait definitions for external dependencies (LedgerRepository)
//! - **services**: Business logic orchestration
//! - **adapters**: Concrete implementations (JSON documents, DuckDB)
//! - **api**: JSON request dispatcher over the services

pub mod adapters;
pub mod api;
pub mod config;
pub mod domain;
pub mod log_migrations;
pub mod migrations;
pub mod ports;
pub mod services;

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};

use adapters::duckdb::DuckDbRepository;
use adapters::json_files::JsonFileRepository;
use config::{Config, StorageBackend};
use ports::LedgerRepository;
use services::*;

// Re-export commonly used types at crate root
pub use domain::result::{Error, OperationResult};
pub use domain::{
    Account, AccountProfile, AccountStatus, FundingRecord, NewAccount, PolicySettings,
    SettingsPatch, Transaction, TransactionStatus, TransactionType,
};
pub use services::{EntryPoint, LogEntry, LogEvent, LoggingService};

/// DuckDB ledger file inside the data directory
pub const DUCKDB_FILE: &str = "zeusbank.duckdb";

/// Main context for Zeus Bank operations
///
/// Holds the configured repository and every service built over it. All
/// mutating services share one lock, so a context is the unit of
/// in-process serialization.
pub struct ZeusContext {
    pub config: Config,
    pub data_dir: PathBuf,
    pub repository: Arc<dyn LedgerRepository>,
    pub ledger_service: LedgerService,
    pub account_service: AccountService,
    pub settings_service: SettingsService,
    pub status_service: StatusService,
    pub doctor_service: DoctorService,
}

impl ZeusContext {
    /// Open the ledger in `data_dir` using config.json and the environment
    pub fn new(data_dir: &Path) -> Result<Self> {
        let config = Config::load(data_dir)?;
        Self::with_config(data_dir, config)
    }

    /// Open the ledger in `data_dir` with an explicit configuration
    pub fn with_config(data_dir: &Path, config: Config) -> Result<Self> {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("failed to create {}", data_dir.display()))?;

        let repository: Arc<dyn LedgerRepository> = match config.storage {
            StorageBackend::Json => Arc::new(JsonFileRepository::open(data_dir)?),
            StorageBackend::Duckdb => {
                let repository = DuckDbRepository::new(&data_dir.join(DUCKDB_FILE))?;
                repository.ensure_schema()?;
                Arc::new(repository)
            }
        };

        let lock = Arc::new(Mutex::new(()));

        let ledger_service = LedgerService::new(Arc::clone(&repository), Arc::clone(&lock));
        let account_service = AccountService::new(
            Arc::clone(&repository),
            Arc::clone(&lock),
            config.admin.clone(),
        );
        let settings_service =
            SettingsService::new(Arc::clone(&repository), Arc::clone(&lock), config.propagation);
        let status_service = StatusService::new(Arc::clone(&repository));
        let doctor_service = DoctorService::new(Arc::clone(&repository));

        Ok(Self {
            config,
            data_dir: data_dir.to_path_buf(),
            repository,
            ledger_service,
            account_service,
            settings_service,
            status_service,
            doctor_service,
        })
    }
}
