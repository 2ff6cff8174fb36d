//! CLI command implementations

pub mod accounts;
pub mod api;
pub mod doctor;
pub mod ledger;
pub mod logs;
pub mod settings;
pub mod status;

use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{anyhow, Context, Result};
use rust_decimal::Decimal;
use zeusbank_core::{EntryPoint, LogEvent, LoggingService, ZeusContext};

/// Get the logging service for CLI operations
///
/// Returns None if logging fails to initialize (shouldn't block operations)
pub fn get_logger() -> Option<LoggingService> {
    let data_dir = get_data_dir().ok()?;
    std::fs::create_dir_all(&data_dir).ok()?;
    LoggingService::new(&data_dir, EntryPoint::Cli, env!("CARGO_PKG_VERSION")).ok()
}

/// Log an event, ignoring any errors (logging should never break the app)
pub fn log_event(logger: &Option<LoggingService>, event: LogEvent) {
    if let Some(l) = logger {
        let _ = l.log(event);
    }
}

/// Get the data directory from `ZEUSBANK_DIR` or default to `~/.zeusbank`
pub fn get_data_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("ZEUSBANK_DIR") {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|home| home.join(".zeusbank"))
        .ok_or_else(|| anyhow!("Could not find home directory; set ZEUSBANK_DIR"))
}

/// Open the ledger in the data directory
pub fn get_context() -> Result<ZeusContext> {
    let data_dir = get_data_dir()?;
    ZeusContext::new(&data_dir).context("Failed to initialize Zeus Bank context")
}

/// Parse a money amount typed on the command line
pub fn parse_amount(raw: &str) -> Result<Decimal> {
    Decimal::from_str(raw.trim().trim_start_matches('$').replace(',', "").as_str())
        .with_context(|| format!("'{}' is not a valid amount", raw))
}

/// Render an amount with two decimals
pub fn format_money(amount: Decimal) -> String {
    format!("{:.2}", amount)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("12.50").unwrap(), Decimal::new(1250, 2));
        assert_eq!(parse_amount("$1,000").unwrap(), Decimal::new(1000, 0));
        assert!(parse_amount("ten").is_err());
    }

    #[test]
    fn test_format_money() {
        assert_eq!(format_money(Decimal::new(5, 0)), "5.00");
        assert_eq!(format_money(Decimal::new(-1234, 2)), "-12.34");
    }
}
