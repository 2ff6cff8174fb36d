//! Status command - ledger summary

use anyhow::Result;
use colored::Colorize;
use comfy_table::{ContentArrangement, Table};

use super::{format_money, get_context};

pub fn run(json: bool) -> Result<()> {
    let ctx = get_context()?;
    let status = ctx.status_service.get_status()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!("{}", "Zeus Bank Status".bold());
    println!();

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);

    table.add_row(vec!["Storage", status.backend.as_str()]);
    table.add_row(vec!["Accounts", &status.total_accounts.to_string()]);
    table.add_row(vec!["Total balance", &format_money(status.total_balance)]);
    table.add_row(vec!["Transactions", &status.total_transactions.to_string()]);
    table.add_row(vec!["Pending amount", &format_money(status.pending_amount)]);
    table.add_row(vec!["Total funded", &format_money(status.total_funded)]);
    table.add_row(vec!["Funding deposits", &status.funding_count.to_string()]);

    println!("{}", table);
    println!();

    if let Some(latest) = &status.latest_transaction {
        println!("Latest transaction: {}", latest);
        println!();
    }

    let breakdowns = [
        ("Accounts by status", &status.accounts_by_status),
        ("Transactions by status", &status.transactions_by_status),
        ("Transactions by type", &status.transactions_by_type),
    ];
    for (title, counts) in breakdowns {
        if counts.is_empty() {
            continue;
        }
        println!("{}", title.bold());
        for (name, count) in counts {
            println!("  • {}: {}", name, count);
        }
    }

    Ok(())
}
