//! Settings service - policy reads and updates with propagation

use std::sync::{Arc, Mutex};

use super::lock_ledger;
use crate::config::PropagationMode;
use crate::domain::result::Result;
use crate::domain::{AccountRegistry, PolicySettings, SettingsPatch, TransactionType};
use crate::ports::{Changeset, LedgerRepository};

pub struct SettingsService {
    repository: Arc<dyn LedgerRepository>,
    lock: Arc<Mutex<()>>,
    propagation: PropagationMode,
}

impl SettingsService {
    pub fn new(
        repository: Arc<dyn LedgerRepository>,
        lock: Arc<Mutex<()>>,
        propagation: PropagationMode,
    ) -> Self {
        Self {
            repository,
            lock,
            propagation,
        }
    }

    pub fn get(&self) -> Result<PolicySettings> {
        self.repository.get_settings()
    }

    pub fn propagation(&self) -> PropagationMode {
        self.propagation
    }

    /// Merge `patch` into the policy.
    ///
    /// A new interbank or withdrawal status is written onto every existing
    /// transfer or withdrawal. In raw mode balances stay where they are and
    /// the record remembers whether its effects are booked; in reconcile
    /// mode each rewritten record moves balances like an admin edit.
    /// A new default account status is applied to every account.
    pub fn update(&self, patch: SettingsPatch) -> Result<PolicySettings> {
        patch.validate()?;

        let _guard = lock_ledger(&self.lock)?;
        let mut settings = self.repository.get_settings()?;
        settings.merge(&patch);

        let mut registry = AccountRegistry::new(self.repository.get_accounts()?);
        let mut rewritten = Vec::new();

        if patch.interbank_transfer_status.is_some() || patch.withdrawal_status.is_some() {
            for before in self.repository.get_transactions()? {
                let status = match before.tx_type {
                    TransactionType::Transfer => patch.interbank_transfer_status,
                    TransactionType::Withdrawal => patch.withdrawal_status,
                    TransactionType::Deposit => None,
                };
                let Some(status) = status.filter(|s| *s != before.status) else {
                    continue;
                };

                let mut after = before.clone();
                match self.propagation {
                    PropagationMode::Raw => after.restate(status),
                    PropagationMode::Reconcile => {
                        after.status = status;
                        after.balance_applied = None;
                        registry.reconcile(&before, &after);
                    }
                }
                rewritten.push(after);
            }
        }

        if let Some(status) = patch.default_account_status {
            registry.bulk_set_status(status);
        }

        self.repository.commit(Changeset {
            upsert_accounts: registry.take_dirty(),
            upsert_transactions: rewritten,
            settings: Some(settings.clone()),
            ..Default::default()
        })?;

        Ok(settings)
    }
}
