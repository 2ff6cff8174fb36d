//! Port definitions (hexagonal architecture)
//!
//! Ports define the interfaces for external dependencies. The ledger
//! services depend only on these traits, not on concrete implementations.

mod repository;

pub use repository::{Changeset, LedgerRepository};
