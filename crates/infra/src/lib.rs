//! Infrastructure layer: stores, reset tokens, config and the ledger use cases.

pub mod config;
pub mod db;
pub mod ledger_service;
pub mod reset_token;
pub mod store;

pub use ledger_service::LedgerService;
