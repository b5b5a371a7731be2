//! Account store and transaction ledger boundary.
//!
//! Traits describe what the orchestrator needs; `InMemoryStore` backs tests
//! and local runs, `PostgresStore` backs deployments.

pub mod in_memory;
pub mod postgres;
pub mod r#trait;

pub use in_memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use r#trait::{AccountStore, LedgerStore, LedgerTx, Store, StoreError};
