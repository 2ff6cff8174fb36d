//! Settings commands - view and change the bank policy

use anyhow::{bail, Result};
use clap::{Args, Subcommand};

use super::{format_money, get_context, parse_amount};
use crate::output;
use zeusbank_core::{AccountStatus, PolicySettings, SettingsPatch, TransactionStatus};

#[derive(Subcommand)]
pub enum SettingsCommands {
    /// Show current policy settings
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Change one or more policy settings
    Set(SetArgs),
}

#[derive(Args)]
pub struct SetArgs {
    #[arg(long)]
    interbank_transfer_status: Option<TransactionStatus>,
    #[arg(long)]
    withdrawal_status: Option<TransactionStatus>,
    #[arg(long)]
    default_account_status: Option<AccountStatus>,
    #[arg(long)]
    default_transaction_status: Option<TransactionStatus>,
    #[arg(long)]
    transaction_fee: Option<String>,
    /// Zero disables the limit
    #[arg(long)]
    daily_transfer_limit: Option<String>,
    /// Turn the daily transfer limit check on or off
    #[arg(long)]
    enforce_daily_limit: Option<bool>,
    #[arg(long)]
    initial_balance: Option<String>,
    #[arg(long)]
    account_number_prefix: Option<String>,
    #[arg(long)]
    email_notifications: Option<bool>,
    #[arg(long)]
    sms_notifications: Option<bool>,
    #[arg(long)]
    admin_alert_threshold: Option<String>,
    /// Output as JSON
    #[arg(long)]
    json: bool,
}

impl SetArgs {
    fn to_patch(&self) -> Result<SettingsPatch> {
        let amount = |raw: &Option<String>| raw.as_deref().map(parse_amount).transpose();
        Ok(SettingsPatch {
            interbank_transfer_status: self.interbank_transfer_status,
            withdrawal_status: self.withdrawal_status,
            default_account_status: self.default_account_status,
            default_transaction_status: self.default_transaction_status,
            transaction_fee: amount(&self.transaction_fee)?,
            daily_transfer_limit: amount(&self.daily_transfer_limit)?,
            enforce_daily_limit: self.enforce_daily_limit,
            initial_balance: amount(&self.initial_balance)?,
            account_number_prefix: self.account_number_prefix.clone(),
            email_notifications: self.email_notifications,
            sms_notifications: self.sms_notifications,
            admin_alert_threshold: amount(&self.admin_alert_threshold)?,
        })
    }
}

pub fn run(command: SettingsCommands) -> Result<()> {
    let ctx = get_context()?;

    match command {
        SettingsCommands::Show { json } => {
            let settings = ctx.settings_service.get()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&settings)?);
                return Ok(());
            }
            print_settings(&settings);
            output::info(&format!(
                "Status changes propagate in {} mode",
                ctx.settings_service.propagation()
            ));
        }
        SettingsCommands::Set(args) => {
            let patch = args.to_patch()?;
            if patch.is_empty() {
                bail!("Nothing to change; pass at least one setting flag");
            }
            let settings = ctx.settings_service.update(patch)?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&settings)?);
                return Ok(());
            }
            output::success("Settings updated successfully");
            print_settings(&settings);
        }
    }

    Ok(())
}

fn print_settings(settings: &PolicySettings) {
    let mut table = output::create_table();
    table.set_header(vec!["Setting", "Value"]);
    let rows = [
        ("Interbank transfer status", settings.interbank_transfer_status.to_string()),
        ("Withdrawal status", settings.withdrawal_status.to_string()),
        ("Default account status", settings.default_account_status.to_string()),
        ("Default transaction status", settings.default_transaction_status.to_string()),
        ("Transaction fee", format_money(settings.transaction_fee)),
        ("Daily transfer limit", format_money(settings.daily_transfer_limit)),
        ("Enforce daily limit", settings.enforce_daily_limit.to_string()),
        ("Initial balance", format_money(settings.initial_balance)),
        ("Account number prefix", settings.account_number_prefix.clone()),
        ("Email notifications", settings.email_notifications.to_string()),
        ("SMS notifications", settings.sms_notifications.to_string()),
        ("Admin alert threshold", format_money(settings.admin_alert_threshold)),
    ];
    for (name, value) in rows {
        table.add_row(vec![name.to_string(), value]);
    }
    println!("{}", table);
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use rust_decimal::Decimal;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        args: SetArgs,
    }

    #[test]
    fn test_flags_build_patch() {
        let harness = Harness::parse_from([
            "zb",
            "--withdrawal-status",
            "successful",
            "--daily-transfer-limit",
            "0",
            "--enforce-daily-limit",
            "true",
            "--account-number-prefix",
            "77",
        ]);
        let patch = harness.args.to_patch().unwrap();
        assert_eq!(patch.withdrawal_status, Some(TransactionStatus::Successful));
        assert_eq!(patch.daily_transfer_limit, Some(Decimal::ZERO));
        assert_eq!(patch.enforce_daily_limit, Some(true));
        assert_eq!(patch.account_number_prefix.as_deref(), Some("77"));
        assert!(patch.transaction_fee.is_none());
    }

    #[test]
    fn test_no_flags_is_empty_patch() {
        let harness = Harness::parse_from(["zb"]);
        assert!(harness.args.to_patch().unwrap().is_empty());
    }
}
