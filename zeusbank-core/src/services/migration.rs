//! Ledger schema migrations for the DuckDB backend
//!
//! `000_migrations.sql` creates the `sys_migrations` bookkeeping table and is
//! always applied first. Every later file upgrades the ledger tables
//! (`sys_accounts`, `sys_transactions`, `sys_settings`, `sys_funding_history`)
//! and is applied once, in file-name order.

use duckdb::Connection;

use crate::domain::result::Result;
use crate::migrations::MIGRATIONS;

const BOOTSTRAP: &str = "000_migrations.sql";

/// What a migration run changed
#[derive(Debug)]
pub struct MigrationResult {
    /// Files applied by this run, in order
    pub applied: Vec<String>,
    /// Files found already recorded before this run
    pub already_applied: usize,
}

pub struct MigrationService<'a> {
    conn: &'a Connection,
}

impl<'a> MigrationService<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Bring the ledger schema up to date.
    ///
    /// A store opened by an older build gets only the files it is missing,
    /// so existing accounts and transactions are kept.
    pub fn run_pending(&self) -> Result<MigrationResult> {
        let mut applied = Vec::new();

        if !self.bookkeeping_exists()? {
            let sql = MIGRATIONS
                .iter()
                .find(|(name, _)| *name == BOOTSTRAP)
                .map(|(_, sql)| *sql);
            if let Some(sql) = sql {
                self.apply(BOOTSTRAP, sql)?;
                applied.push(BOOTSTRAP.to_string());
            }
        }

        let recorded = self.get_applied()?;
        let already_applied = recorded.len() - applied.len();

        for (name, sql) in MIGRATIONS.iter().filter(|(name, _)| *name != BOOTSTRAP) {
            if recorded.iter().any(|r| r == name) {
                continue;
            }
            self.apply(name, sql)?;
            applied.push(name.to_string());
        }

        Ok(MigrationResult {
            applied,
            already_applied,
        })
    }

    fn bookkeeping_exists(&self) -> Result<bool> {
        let count: std::result::Result<i64, _> = self.conn.query_row(
            "SELECT COUNT(*) FROM information_schema.tables WHERE table_name = 'sys_migrations'",
            [],
            |row| row.get(0),
        );
        Ok(matches!(count, Ok(n) if n > 0))
    }

    /// Recorded migration names, sorted
    pub fn get_applied(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT migration_name FROM sys_migrations ORDER BY migration_name")?;
        let names = stmt.query_map([], |row| row.get::<_, String>(0))?;
        Ok(names.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    pub fn get_pending(&self) -> Result<Vec<String>> {
        let recorded = self.get_applied()?;
        Ok(MIGRATIONS
            .iter()
            .map(|(name, _)| name.to_string())
            .filter(|name| !recorded.contains(name))
            .collect())
    }

    fn apply(&self, name: &str, sql: &str) -> Result<()> {
        self.conn.execute_batch(sql)?;
        self.conn.execute(
            "INSERT INTO sys_migrations (migration_name) VALUES (?)",
            [name],
        )?;
        Ok(())
    }
}
