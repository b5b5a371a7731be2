//! `pinledger-core` — domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! the error taxonomy shared by every layer, identifiers, and the `Money`
//! fixed-point amount used for balances and ledger entries.

pub mod entity;
pub mod error;
pub mod id;
pub mod money;
pub mod value_object;

pub use entity::Entity;
pub use error::{DomainError, DomainResult, StatusCode};
pub use id::{AccountId, AccountNumber, TransactionId};
pub use money::Money;
pub use value_object::ValueObject;
