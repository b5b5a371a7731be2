//! Account ledger domain (accounts, PINs, ledger entries).
//!
//! Pure domain logic only: no IO, no HTTP, no persistence concerns.

pub mod account;
pub mod guard;
pub mod ledger;
pub mod number;
pub mod pin;
pub mod reset_token;

pub use account::{Account, AccountStatus, NewAccount, validate_account_name};
pub use guard::{MAX_PIN_ATTEMPTS, PinGuard, PinVerdict};
pub use ledger::{
    Direction, HistoryPage, HistoryQuery, LedgerEntry, NewLedgerEntry, Pagination,
    TransactionType,
};
pub use number::{AccountNumberAllocator, MAX_ALLOCATION_ATTEMPTS};
pub use pin::{Pin, PinHash};
pub use reset_token::{RESET_TOKEN_TTL, ResetGrant, ResetToken};
