//! Service layer - business logic orchestration
//!
//! Services coordinate domain logic and port interactions. Each service
//! focuses on a specific use case or feature area. Mutating services share
//! one process-wide lock so check-then-act sequences cannot interleave.

mod accounts;
mod doctor;
mod ledger;
pub mod logging;
pub mod migration;
mod settings;
mod status;

use std::sync::{Mutex, MutexGuard};

use crate::domain::result::{Error, Result};

pub use accounts::{AccountService, ProfileUpdate, Session, UserUpdate};
pub use doctor::{CheckResult, DoctorResult, DoctorService, DoctorSummary};
pub use ledger::{
    LedgerService, TransactionEdit, TransactionFilter, TransferOutcome, TransferRequest,
};
pub use logging::{EntryPoint, LogEntry, LogEvent, LoggingService};
pub use migration::{MigrationResult, MigrationService};
pub use settings::SettingsService;
pub use status::{StatusService, StatusSummary};

/// Take the mutation lock shared by every service of one context
fn lock_ledger(lock: &Mutex<()>) -> Result<MutexGuard<'_, ()>> {
    lock.lock()
        .map_err(|e| Error::database(format!("Lock poisoned: {}", e)))
}
