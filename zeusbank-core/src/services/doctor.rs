//! Doctor service - ledger health checks

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::json;

use crate::domain::result::Result;
use crate::domain::{TransactionType, ADMIN_ACCOUNT, EXTERNAL_ACCOUNT};
use crate::ports::LedgerRepository;

/// Pending records older than this are flagged
const STALE_PENDING_DAYS: i64 = 7;

pub struct DoctorService {
    repository: Arc<dyn LedgerRepository>,
}

impl DoctorService {
    pub fn new(repository: Arc<dyn LedgerRepository>) -> Self {
        Self { repository }
    }

    /// Run all health checks
    pub fn run_checks(&self) -> Result<DoctorResult> {
        let accounts = self.repository.get_accounts()?;
        let transactions = self.repository.get_transactions()?;
        let known: HashSet<&str> = accounts.iter().map(|a| a.account_number.as_str()).collect();
        let mut checks = HashMap::new();

        // Owner of the record no longer exists, e.g. after a user deletion
        let orphaned: Vec<serde_json::Value> = transactions
            .iter()
            .filter(|t| !known.contains(t.owner()))
            .map(|t| json!({"transaction_id": t.id, "type": t.tx_type.as_str()}))
            .collect();
        checks.insert(
            "orphaned_transactions".to_string(),
            CheckResult::from_findings(
                "error",
                orphaned,
                "No orphaned transactions found",
                |n| format!("{} transaction(s) reference missing accounts", n),
            ),
        );

        let mut seen: HashMap<&str, usize> = HashMap::new();
        for account in &accounts {
            *seen.entry(account.account_number.as_str()).or_insert(0) += 1;
        }
        let duplicates: Vec<serde_json::Value> = seen
            .iter()
            .filter(|(_, count)| **count > 1)
            .map(|(number, count)| json!({"account_number": number, "count": count}))
            .collect();
        checks.insert(
            "duplicate_account_numbers".to_string(),
            CheckResult::from_findings(
                "error",
                duplicates,
                "All account numbers are unique",
                |n| format!("{} account number(s) are shared by several accounts", n),
            ),
        );

        let negative: Vec<serde_json::Value> = accounts
            .iter()
            .filter(|a| a.balance < Decimal::ZERO)
            .map(|a| json!({"account_id": a.id}))
            .collect();
        checks.insert(
            "negative_balances".to_string(),
            CheckResult::from_findings(
                "warning",
                negative,
                "No accounts are overdrawn",
                |n| format!("{} account(s) have a negative balance", n),
            ),
        );

        let cutoff = Utc::now() - Duration::days(STALE_PENDING_DAYS);
        let stale: Vec<serde_json::Value> = transactions
            .iter()
            .filter(|t| !t.status.is_successful() && t.timestamp < cutoff)
            .map(|t| json!({"transaction_id": t.id, "date": t.timestamp.to_rfc3339()}))
            .collect();
        checks.insert(
            "stale_pending".to_string(),
            CheckResult::from_findings(
                "warning",
                stale,
                "No transactions pending for more than a week",
                |n| format!("{} transaction(s) pending for over {} days", n, STALE_PENDING_DAYS),
            ),
        );

        // Transfers booked against a number that is neither an account nor a sentinel
        let unresolved: Vec<serde_json::Value> = transactions
            .iter()
            .filter(|t| t.tx_type == TransactionType::Transfer && !t.status.is_successful())
            .filter(|t| {
                !known.contains(t.to_account.as_str())
                    && t.to_account != EXTERNAL_ACCOUNT
                    && t.to_account != ADMIN_ACCOUNT
            })
            .map(|t| json!({"transaction_id": t.id}))
            .collect();
        checks.insert(
            "unresolved_recipients".to_string(),
            CheckResult::from_findings(
                "warning",
                unresolved,
                "Every pending transfer has a known recipient",
                |n| format!("{} pending transfer(s) credit nobody on approval", n),
            ),
        );

        let passed = checks.values().filter(|c| c.status == "pass").count() as i64;
        let warnings = checks.values().filter(|c| c.status == "warning").count() as i64;
        let errors = checks.values().filter(|c| c.status == "error").count() as i64;

        Ok(DoctorResult {
            checks,
            summary: DoctorSummary { passed, warnings, errors },
        })
    }
}

#[derive(Debug, Serialize)]
pub struct DoctorResult {
    pub checks: HashMap<String, CheckResult>,
    pub summary: DoctorSummary,
}

#[derive(Debug, Serialize)]
pub struct CheckResult {
    pub status: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<serde_json::Value>>,
}

impl CheckResult {
    fn from_findings(
        severity: &str,
        findings: Vec<serde_json::Value>,
        pass_message: &str,
        fail_message: impl Fn(usize) -> String,
    ) -> Self {
        if findings.is_empty() {
            Self {
                status: "pass".to_string(),
                message: pass_message.to_string(),
                details: None,
            }
        } else {
            Self {
                status: severity.to_string(),
                message: fail_message(findings.len()),
                details: Some(findings),
            }
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DoctorSummary {
    pub passed: i64,
    pub warnings: i64,
    pub errors: i64,
}
