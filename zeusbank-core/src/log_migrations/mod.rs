//! Event log migrations - SQL for `logs.duckdb`, embedded at build time
//!
//! Kept apart from the ledger migrations: the event log is a separate
//! database file that exists regardless of which ledger backend is in use.

/// (filename, sql_content), applied in order
pub const LOG_MIGRATIONS: &[(&str, &str)] = &[
    ("000_migrations.sql", include_str!("000_migrations.sql")),
    ("001_initial_schema.sql", include_str!("001_initial_schema.sql")),
];
