//! Policy settings - the admin-controlled singleton

use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::account::AccountStatus;
use super::result::{Error, Result};
use super::transaction::TransactionStatus;

/// Global policy. Persisted as `adminSettings.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PolicySettings {
    pub interbank_transfer_status: TransactionStatus,
    pub withdrawal_status: TransactionStatus,
    pub default_account_status: AccountStatus,
    /// Applied to transfers whose recipient is not a known account
    pub default_transaction_status: TransactionStatus,
    /// Recorded for display; the ledger never charges it
    #[serde(with = "rust_decimal::serde::float")]
    pub transaction_fee: Decimal,
    /// Per-sender outgoing volume per UTC day. Only checked when
    /// `enforce_daily_limit` is on; zero disables it either way.
    #[serde(with = "rust_decimal::serde::float")]
    pub daily_transfer_limit: Decimal,
    pub enforce_daily_limit: bool,
    #[serde(with = "rust_decimal::serde::float")]
    pub initial_balance: Decimal,
    pub account_number_prefix: String,
    pub email_notifications: bool,
    pub sms_notifications: bool,
    #[serde(with = "rust_decimal::serde::float")]
    pub admin_alert_threshold: Decimal,
}

impl Default for PolicySettings {
    fn default() -> Self {
        Self {
            interbank_transfer_status: TransactionStatus::Successful,
            withdrawal_status: TransactionStatus::Pending,
            default_account_status: AccountStatus::Pending,
            default_transaction_status: TransactionStatus::Pending,
            transaction_fee: Decimal::new(15, 1),
            daily_transfer_limit: Decimal::new(50000, 0),
            enforce_daily_limit: false,
            initial_balance: Decimal::ZERO,
            account_number_prefix: "5588".to_string(),
            email_notifications: true,
            sms_notifications: false,
            admin_alert_threshold: Decimal::new(10000, 0),
        }
    }
}

/// Partial update. Absent fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interbank_transfer_status: Option<TransactionStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub withdrawal_status: Option<TransactionStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_account_status: Option<AccountStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_transaction_status: Option<TransactionStatus>,
    #[serde(
        default,
        with = "rust_decimal::serde::float_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub transaction_fee: Option<Decimal>,
    #[serde(
        default,
        with = "rust_decimal::serde::float_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub daily_transfer_limit: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enforce_daily_limit: Option<bool>,
    #[serde(
        default,
        with = "rust_decimal::serde::float_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub initial_balance: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_number_prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_notifications: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sms_notifications: Option<bool>,
    #[serde(
        default,
        with = "rust_decimal::serde::float_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub admin_alert_threshold: Option<Decimal>,
}

impl SettingsPatch {
    pub fn is_empty(&self) -> bool {
        *self == SettingsPatch::default()
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(prefix) = &self.account_number_prefix {
            let re = Regex::new(r"^[0-9]{1,8}$").map_err(|e| Error::validation(e.to_string()))?;
            if !re.is_match(prefix) {
                return Err(Error::validation(
                    "accountNumberPrefix must be 1 to 8 digits",
                ));
            }
        }

        let amounts = [
            ("transactionFee", self.transaction_fee),
            ("dailyTransferLimit", self.daily_transfer_limit),
            ("initialBalance", self.initial_balance),
            ("adminAlertThreshold", self.admin_alert_threshold),
        ];
        for (name, value) in amounts {
            if matches!(value, Some(v) if v.is_sign_negative() && !v.is_zero()) {
                return Err(Error::validation(format!("{} cannot be negative", name)));
            }
        }
        Ok(())
    }
}

impl PolicySettings {
    /// Merge a validated patch into the settings
    pub fn merge(&mut self, patch: &SettingsPatch) {
        if let Some(v) = patch.interbank_transfer_status {
            self.interbank_transfer_status = v;
        }
        if let Some(v) = patch.withdrawal_status {
            self.withdrawal_status = v;
        }
        if let Some(v) = patch.default_account_status {
            self.default_account_status = v;
        }
        if let Some(v) = patch.default_transaction_status {
            self.default_transaction_status = v;
        }
        if let Some(v) = patch.transaction_fee {
            self.transaction_fee = v;
        }
        if let Some(v) = patch.daily_transfer_limit {
            self.daily_transfer_limit = v;
        }
        if let Some(v) = patch.enforce_daily_limit {
            self.enforce_daily_limit = v;
        }
        if let Some(v) = patch.initial_balance {
            self.initial_balance = v;
        }
        if let Some(v) = &patch.account_number_prefix {
            self.account_number_prefix = v.clone();
        }
        if let Some(v) = patch.email_notifications {
            self.email_notifications = v;
        }
        if let Some(v) = patch.sms_notifications {
            self.sms_notifications = v;
        }
        if let Some(v) = patch.admin_alert_threshold {
            self.admin_alert_threshold = v;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_shipped_policy() {
        let settings = PolicySettings::default();
        assert_eq!(settings.interbank_transfer_status, TransactionStatus::Successful);
        assert_eq!(settings.withdrawal_status, TransactionStatus::Pending);
        assert_eq!(settings.account_number_prefix, "5588");
        assert_eq!(settings.transaction_fee, Decimal::new(15, 1));
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let settings: PolicySettings =
            serde_json::from_str(r#"{"withdrawalStatus":"successful","initialBalance":25}"#).unwrap();
        assert_eq!(settings.withdrawal_status, TransactionStatus::Successful);
        assert_eq!(settings.initial_balance, Decimal::new(25, 0));
        assert_eq!(settings.default_account_status, AccountStatus::Pending);
    }

    #[test]
    fn test_merge_only_touches_present_fields() {
        let mut settings = PolicySettings::default();
        let patch: SettingsPatch =
            serde_json::from_str(r#"{"accountNumberPrefix":"7001","smsNotifications":true,"enforceDailyLimit":true}"#).unwrap();
        patch.validate().unwrap();
        settings.merge(&patch);
        assert_eq!(settings.account_number_prefix, "7001");
        assert!(settings.sms_notifications);
        assert!(settings.enforce_daily_limit);
        assert_eq!(settings.daily_transfer_limit, Decimal::new(50000, 0));
        assert_eq!(settings.interbank_transfer_status, TransactionStatus::Successful);
    }

    #[test]
    fn test_patch_validation() {
        let bad_prefix = SettingsPatch {
            account_number_prefix: Some("55A8".to_string()),
            ..Default::default()
        };
        assert!(bad_prefix.validate().is_err());

        let negative = SettingsPatch {
            daily_transfer_limit: Some(Decimal::new(-1, 0)),
            ..Default::default()
        };
        assert!(negative.validate().is_err());

        assert!(SettingsPatch::default().is_empty());
    }
}
