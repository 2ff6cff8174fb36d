//! Terminal rendering for ledger output

use colored::{ColoredString, Colorize};
use comfy_table::{presets::UTF8_FULL_CONDENSED, Cell, Color, ContentArrangement, Table};
use zeusbank_core::{AccountStatus, TransactionStatus};

pub fn success(msg: &str) {
    println!("{}", msg.green());
}

pub fn error(msg: &str) {
    eprintln!("{}", msg.red());
}

pub fn warning(msg: &str) {
    println!("{}", msg.yellow());
}

pub fn info(msg: &str) {
    println!("{}", msg.cyan());
}

/// Report the outcome of a money movement; anything short of booked is a warning
pub fn settled(status: TransactionStatus, msg: &str) {
    if status.is_successful() {
        success(msg);
    } else {
        warning(msg);
    }
}

pub fn create_table() -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Two-column table for a single record
pub fn record_table<'a>(rows: impl IntoIterator<Item = (&'a str, Cell)>) -> Table {
    let mut table = create_table();
    for (field, value) in rows {
        table.add_row(vec![Cell::new(field), value]);
    }
    table
}

fn transaction_color(status: TransactionStatus) -> Color {
    match status {
        TransactionStatus::Successful => Color::Green,
        TransactionStatus::Pending => Color::Yellow,
    }
}

pub fn transaction_status_cell(status: TransactionStatus) -> Cell {
    Cell::new(status).fg(transaction_color(status))
}

pub fn account_status_label(status: AccountStatus) -> ColoredString {
    let label = status.to_string();
    match status {
        AccountStatus::Active => label.green(),
        AccountStatus::Pending => label.yellow(),
        AccountStatus::Suspended => label.red(),
    }
}

/// Log file sizes for `zb logs`
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 3] = ["KB", "MB", "GB"];

    if bytes < 1024 {
        return format!("{} bytes", bytes);
    }
    let mut size = bytes as f64 / 1024.0;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", size, UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 bytes");
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.0 MB");
        assert_eq!(format_size(3 * 1024 * 1024 * 1024), "3.0 GB");
    }

    #[test]
    fn test_status_colors() {
        assert_eq!(transaction_color(TransactionStatus::Successful), Color::Green);
        assert_eq!(transaction_color(TransactionStatus::Failed), Color::Red);
    }

    #[test]
    fn test_record_table_has_one_row_per_field() {
        let table = record_table([("Id", Cell::new("tx-1")), ("Amount", Cell::new("5.00"))]);
        assert_eq!(table.row_iter().count(), 2);
    }
}
