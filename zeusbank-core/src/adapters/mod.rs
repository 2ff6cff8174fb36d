//! Adapter implementations
//!
//! Adapters implement the repository port with concrete storage:
//! - JSON documents in the data directory (default)
//! - DuckDB, for a transactional single-file ledger

pub mod duckdb;
pub mod json_files;
