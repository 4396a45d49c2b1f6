//! Ledger persistence boundary.
//!
//! This module defines the storage abstraction for the asset ledger without
//! making backend assumptions. Each mutating operation is atomic at the store
//! level so workflow code never stitches multi-row changes together itself.

pub mod in_memory;
pub mod postgres;
pub mod r#trait;

pub use in_memory::InMemoryLedgerStore;
pub use postgres::PostgresLedgerStore;
pub use r#trait::{
    AssetFilter, AssignmentFilter, LedgerStore, PurchaseFilter, StoreError, TransferFilter,
};

/// Midnight UTC at the start of `date`. Both backends use this to turn a
/// business date bound into a timestamp comparison against `created_at`.
pub(crate) fn midnight_utc(date: chrono::NaiveDate) -> chrono::DateTime<chrono::Utc> {
    date.and_time(chrono::NaiveTime::MIN).and_utc()
}
