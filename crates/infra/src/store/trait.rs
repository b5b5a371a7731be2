use async_trait::async_trait;
use thiserror::Error;

use pinledger_accounting::{
    Account, Direction, HistoryPage, HistoryQuery, LedgerEntry, NewAccount, NewLedgerEntry,
    PinHash,
};
use pinledger_core::{AccountId, AccountNumber, DomainError, Money, TransactionId};

/// Store operation error.
///
/// These are **infrastructure errors**; the orchestrator converts them into
/// [`DomainError`] at its boundary.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No live row matched. The payload names the entity ("Account").
    #[error("{0} not found")]
    NotFound(String),

    /// Unique constraint violation.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The row exists but the requested change is not allowed.
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("database error: {0}")]
    Database(String),

    /// Pool closed, acquire timeout or connection failure.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<StoreError> for DomainError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound(what) => DomainError::not_found(what),
            StoreError::Validation(msg) => DomainError::validation(msg),
            StoreError::Conflict(msg) | StoreError::Database(msg) | StoreError::Unavailable(msg) => {
                DomainError::system(msg)
            }
        }
    }
}

/// Durable record of accounts.
///
/// Every read and write ignores soft-deleted rows.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Insert a new ACTIVE account with zero failed attempts.
    ///
    /// A taken account number is reported as [`StoreError::Conflict`].
    async fn insert(&self, account: NewAccount) -> Result<Account, StoreError>;

    async fn find_by_id(&self, id: AccountId) -> Result<Account, StoreError>;

    async fn find_by_number(&self, number: &AccountNumber) -> Result<Account, StoreError>;

    /// Includes soft-deleted rows: numbers are never reused.
    async fn exists_by_number(&self, number: &AccountNumber) -> Result<bool, StoreError>;

    /// Live accounts, newest first.
    async fn list(&self) -> Result<Vec<Account>, StoreError>;

    async fn rename(&self, id: AccountId, account_name: &str) -> Result<Account, StoreError>;

    /// Increment the failure counter and, when it reaches the lockout
    /// threshold, block the account, in one atomic step. Returns the new count.
    async fn record_failed_pin(&self, id: AccountId) -> Result<u32, StoreError>;

    async fn clear_failed_pins(&self, id: AccountId) -> Result<(), StoreError>;

    /// Replace the PIN hash, reset the counter and reactivate the account.
    async fn replace_pin(&self, id: AccountId, pin_hash: &PinHash) -> Result<(), StoreError>;

    /// Soft delete. Refused with [`StoreError::Validation`] while the balance is positive.
    async fn soft_delete(&self, id: AccountId) -> Result<(), StoreError>;
}

/// Durable, append-only transaction ledger plus the unit of work that
/// moves money.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Open a durable transaction. Dropping it without `commit` rolls back.
    async fn begin(&self) -> Result<Box<dyn LedgerTx>, StoreError>;

    async fn find_entry(&self, id: TransactionId) -> Result<LedgerEntry, StoreError>;

    /// Entries matching `query`, newest first, with the unpaged total.
    async fn history(&self, query: &HistoryQuery) -> Result<HistoryPage, StoreError>;
}

/// Writes that must commit or roll back together.
#[async_trait]
pub trait LedgerTx: Send {
    /// Atomic read-modify-write of one balance, rounded to two places.
    ///
    /// Negative results are returned, not refused: the caller checks and
    /// rolls back. `amount` must be positive.
    async fn adjust_balance(
        &mut self,
        id: AccountId,
        amount: Money,
        direction: Direction,
    ) -> Result<Money, StoreError>;

    async fn append_entry(&mut self, entry: NewLedgerEntry) -> Result<LedgerEntry, StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;

    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}

/// Both halves of the persistent state, as one backend.
pub trait Store: AccountStore + LedgerStore {}

impl<T> Store for T where T: AccountStore + LedgerStore {}

pub(crate) fn ensure_positive(amount: Money) -> Result<(), StoreError> {
    if amount.is_positive() {
        Ok(())
    } else {
        Err(StoreError::Validation("amount must be positive".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_map_to_domain_errors() {
        assert_eq!(
            DomainError::from(StoreError::NotFound("Account".into())).public_message(),
            "Account not found"
        );
        assert!(matches!(
            DomainError::from(StoreError::Validation("x".into())),
            DomainError::Validation(_)
        ));
        assert!(matches!(
            DomainError::from(StoreError::Unavailable("pool timed out".into())),
            DomainError::System(_)
        ));
    }
}
