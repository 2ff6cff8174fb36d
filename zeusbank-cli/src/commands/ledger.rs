//! Ledger commands - transfers, withdrawals, funding and transaction admin

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use comfy_table::Cell;
use dialoguer::Confirm;

use super::{format_money, get_context, get_logger, log_event, parse_amount};
use crate::output;
use zeusbank_core::services::{TransactionEdit, TransactionFilter, TransferRequest};
use zeusbank_core::{LogEvent, Transaction, TransactionStatus, TransactionType};

/// Recipient used for withdrawals to outside the bank
const EXTERNAL_ACCOUNT: &str = "EXTERNAL";

#[derive(Subcommand)]
pub enum TxCommands {
    /// List transactions, newest first
    List {
        /// Only transactions involving this owner id
        #[arg(long)]
        user_id: Option<String>,
        /// Only transactions involving this account number
        #[arg(long)]
        account: Option<String>,
        /// Only this type (deposit, withdrawal, transfer)
        #[arg(long = "type")]
        tx_type: Option<TransactionType>,
        /// Only this status (successful, pending, failed)
        #[arg(long)]
        status: Option<TransactionStatus>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one transaction
    Show {
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Change a transaction's amount or status; balances follow
    Edit {
        id: String,
        #[arg(long)]
        amount: Option<String>,
        #[arg(long)]
        status: Option<TransactionStatus>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a transaction and reverse its balance effects
    Delete {
        id: String,
        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },
}

pub struct TransferArgs {
    pub from: String,
    pub to: String,
    pub amount: String,
    pub memo: Option<String>,
    pub tx_type: Option<TransactionType>,
    pub json: bool,
}

pub fn transfer(args: TransferArgs) -> Result<()> {
    let amount = parse_amount(&args.amount)?;
    let ctx = get_context()?;
    let outcome = ctx.ledger_service.transfer(TransferRequest {
        from_account: args.from,
        to_account: args.to,
        amount,
        memo: args.memo.unwrap_or_default(),
        tx_type: args.tx_type,
    })?;

    if outcome.alert {
        log_event(
            &get_logger(),
            LogEvent::new("large_transaction_alert").with_command(outcome.transaction.tx_type.as_str()),
        );
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    output::settled(outcome.transaction.status, &outcome.message);
    print_transaction(&outcome.transaction);
    if outcome.alert {
        output::warning("Amount is at or above the admin alert threshold");
    }
    Ok(())
}

/// Withdrawal to outside the bank
pub fn withdraw(from: String, amount: String, memo: Option<String>, json: bool) -> Result<()> {
    transfer(TransferArgs {
        from,
        to: EXTERNAL_ACCOUNT.to_string(),
        amount,
        memo,
        tx_type: Some(TransactionType::Withdrawal),
        json,
    })
}

pub fn fund(account_number: String, amount: String, memo: Option<String>, json: bool) -> Result<()> {
    let amount = parse_amount(&amount)?;
    let ctx = get_context()?;
    let tx = ctx
        .ledger_service
        .fund_account(&account_number, amount, memo.as_deref())?;

    if json {
        println!("{}", serde_json::to_string_pretty(&tx)?);
        return Ok(());
    }

    output::success(&format!(
        "Funded {} with {}",
        account_number,
        format_money(tx.amount)
    ));
    print_transaction(&tx);
    Ok(())
}

pub fn funding(json: bool) -> Result<()> {
    let ctx = get_context()?;
    let history = ctx.ledger_service.funding_history()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&history)?);
        return Ok(());
    }
    if history.is_empty() {
        println!("No funding recorded.");
        return Ok(());
    }

    let mut table = output::create_table();
    table.set_header(vec!["Date", "Account", "Amount", "Description"]);
    for record in &history {
        table.add_row(vec![
            record.date.format("%Y-%m-%d %H:%M").to_string(),
            record.account_number.clone(),
            format_money(record.amount),
            record.description.clone(),
        ]);
    }
    println!("{}", table);

    let total: rust_decimal::Decimal = history.iter().map(|r| r.amount).sum();
    println!("Total funded: {}", format_money(total).bold());
    Ok(())
}

pub fn run(command: TxCommands) -> Result<()> {
    let ctx = get_context()?;

    match command {
        TxCommands::List {
            user_id,
            account,
            tx_type,
            status,
            json,
        } => {
            let transactions = ctx.ledger_service.list_transactions(&TransactionFilter {
                user_id,
                account_number: account,
                tx_type,
                status,
            })?;

            if json {
                println!("{}", serde_json::to_string_pretty(&transactions)?);
                return Ok(());
            }
            if transactions.is_empty() {
                println!("No transactions found.");
                return Ok(());
            }

            let mut table = output::create_table();
            table.set_header(vec!["Date", "Id", "From", "To", "Type", "Amount", "Status", "Memo"]);
            for tx in &transactions {
                table.add_row(vec![
                    Cell::new(tx.timestamp.format("%Y-%m-%d %H:%M")),
                    Cell::new(&tx.id),
                    Cell::new(&tx.from_account),
                    Cell::new(&tx.to_account),
                    Cell::new(tx.tx_type),
                    Cell::new(format_money(tx.amount)),
                    output::transaction_status_cell(tx.status),
                    Cell::new(&tx.memo),
                ]);
            }
            println!("{}", table);
            println!("{} transaction(s)", transactions.len());
        }
        TxCommands::Show { id, json } => {
            let tx = ctx.ledger_service.get_transaction(&id)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&tx)?);
            } else {
                print_transaction(&tx);
            }
        }
        TxCommands::Edit {
            id,
            amount,
            status,
            json,
        } => {
            let amount = amount.as_deref().map(parse_amount).transpose()?;
            let tx = ctx
                .ledger_service
                .edit_transaction(&id, TransactionEdit { amount, status })?;
            if json {
                println!("{}", serde_json::to_string_pretty(&tx)?);
            } else {
                output::success("Transaction updated successfully");
                print_transaction(&tx);
            }
        }
        TxCommands::Delete { id, force } => {
            let tx = ctx.ledger_service.get_transaction(&id)?;
            if !force {
                print_transaction(&tx);
                if !Confirm::new()
                    .with_prompt("Delete this transaction and reverse its balance effects?")
                    .default(false)
                    .interact()?
                {
                    println!("Cancelled.");
                    return Ok(());
                }
            }
            ctx.ledger_service.delete_transaction(&id)?;
            output::success(&format!("Deleted transaction {}", id));
        }
    }

    Ok(())
}

fn print_transaction(tx: &Transaction) {
    let mut rows = vec![
        ("Id", Cell::new(&tx.id)),
        ("Date", Cell::new(tx.timestamp.to_rfc3339())),
        ("From", Cell::new(&tx.from_account)),
        ("To", Cell::new(&tx.to_account)),
        ("Type", Cell::new(tx.tx_type)),
        ("Amount", Cell::new(format_money(tx.amount))),
        ("Status", output::transaction_status_cell(tx.status)),
    ];
    if !tx.memo.is_empty() {
        rows.push(("Memo", Cell::new(&tx.memo)));
    }
    println!("{}", output::record_table(rows));
}
