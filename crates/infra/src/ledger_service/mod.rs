//! Ledger orchestration (application-level use cases).
//!
//! `LedgerService` composes an account/ledger [`Store`] and a
//! [`ResetTokenStore`] and runs every use case the HTTP layer exposes:
//!
//! ```text
//! request
//!   ↓
//! 1. Validate raw input into domain types
//!   ↓
//! 2. Locate the account (live rows only)
//!   ↓
//! 3. PIN guard (blocked / failure counter / reset on success)
//!   ↓
//! 4. Pre-checks on the loaded snapshot
//!   ↓
//! 5. One durable transaction: adjust balances, post-check, append entries
//!   ↓
//! 6. Commit (any early return drops the transaction and rolls back)
//! ```
//!
//! The failed-attempt counter is written outside the money transaction, so a
//! rejected PIN is remembered even though nothing else happens.
//!
//! Argon2 hashing and verification run on tokio's blocking pool.
//!
//! The service holds no IO of its own; it only talks to the injected stores.

pub mod commands;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{info, instrument, warn};

use pinledger_accounting::{
    Account, AccountNumberAllocator, Direction, LedgerEntry, MAX_ALLOCATION_ATTEMPTS, NewAccount,
    NewLedgerEntry, Pin, PinGuard, PinHash, PinVerdict, RESET_TOKEN_TTL, ResetGrant,
};
use pinledger_core::{AccountId, AccountNumber, DomainError, DomainResult, TransactionId};

use crate::reset_token::ResetTokenStore;
use crate::store::{LedgerTx, Store, StoreError};

pub use commands::{
    BalanceInquiry, CashMovement, CashReceipt, ChangePin, CheckBalance, CreateAccount,
    HistoryResult, MAX_TRANSACTION_AMOUNT, MIN_TRANSACTION_AMOUNT, PageMeta, PinChanged,
    PinReset, RenameAccount, ResetPin, Transfer, TransactionHistory, TransferReceipt,
};

/// Runs the ledger use cases against a store and a reset-token store.
///
/// Both stores are `Arc`-shared so one service can serve every request task.
/// `S` and `T` may be trait objects (`dyn Store`, `dyn ResetTokenStore`) when
/// the backend is picked at runtime.
pub struct LedgerService<S: ?Sized, T: ?Sized> {
    store: Arc<S>,
    tokens: Arc<T>,
    allocator: AccountNumberAllocator,
    reset_ttl: Duration,
}

impl<S, T> LedgerService<S, T>
where
    S: Store + ?Sized,
    T: ResetTokenStore + ?Sized,
{
    pub fn new(store: Arc<S>, tokens: Arc<T>) -> Self {
        Self {
            store,
            tokens,
            allocator: AccountNumberAllocator::new(),
            reset_ttl: RESET_TOKEN_TTL,
        }
    }

    /// Override the reset-token lifetime.
    pub fn with_reset_ttl(mut self, ttl: Duration) -> Self {
        self.reset_ttl = ttl;
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    #[instrument(skip_all, fields(operation = "create_account"), err)]
    pub async fn create_account(&self, cmd: CreateAccount) -> DomainResult<Account> {
        let (account_name, pin, initial_deposit) = cmd.validate()?;
        let pin_hash = hash_pin(pin).await?;

        for attempt in 1..=MAX_ALLOCATION_ATTEMPTS {
            let number = self.allocator.next_candidate()?;
            if self.store.exists_by_number(&number).await? {
                warn!(attempt, account_number = %number, "account number taken, regenerating");
                continue;
            }

            let new = NewAccount::new(
                number.clone(),
                account_name.clone(),
                initial_deposit,
                pin_hash.clone(),
            )?;
            match self.store.insert(new).await {
                Ok(account) => {
                    info!(
                        account_number = %account.account_number,
                        amount = %account.balance,
                        "account created"
                    );
                    return Ok(account);
                }
                Err(StoreError::Conflict(_)) => {
                    warn!(attempt, account_number = %number, "account number conflict on insert");
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(DomainError::system(format!(
            "could not allocate a unique account number after {MAX_ALLOCATION_ATTEMPTS} attempts"
        )))
    }

    #[instrument(skip_all, fields(operation = "deposit", account_number = %cmd.account_number), err)]
    pub async fn deposit(&self, cmd: CashMovement) -> DomainResult<CashReceipt> {
        let (number, amount, pin) = cmd.validate()?;
        let account = self.store.find_by_number(&number).await?;
        self.authenticate(&account, &pin, PinGuard::STANDARD).await?;

        let now = Utc::now();
        let mut tx = self.store.begin().await?;
        let balance_after = tx
            .adjust_balance(account.id, amount, Direction::Increase)
            .await?;
        let entry = tx
            .append_entry(NewLedgerEntry::deposit(&account, amount, now))
            .await?;
        tx.commit().await?;

        info!(account_number = %number, amount = %amount, balance = %balance_after, "deposit committed");
        Ok(CashReceipt {
            account_number: account.account_number,
            account_name: account.account_name,
            balance_before: Direction::Decrease.apply(balance_after, amount)?,
            amount,
            balance_after,
            transaction_date: entry.transaction_time,
            entry,
        })
    }

    #[instrument(skip_all, fields(operation = "withdraw", account_number = %cmd.account_number), err)]
    pub async fn withdraw(&self, cmd: CashMovement) -> DomainResult<CashReceipt> {
        let (number, amount, pin) = cmd.validate()?;
        let account = self.store.find_by_number(&number).await?;
        self.authenticate(&account, &pin, PinGuard::STANDARD).await?;

        if account.balance < amount {
            return Err(DomainError::below_minimum("Insufficient balance"));
        }

        let now = Utc::now();
        let mut tx = self.store.begin().await?;
        let balance_after = tx
            .adjust_balance(account.id, amount, Direction::Decrease)
            .await?;
        if balance_after.is_negative() {
            abort(tx).await;
            warn!(account_number = %number, amount = %amount, "withdrawal would overdraw, rolled back");
            return Err(DomainError::below_minimum("Account balance below minimum"));
        }
        let entry = tx
            .append_entry(NewLedgerEntry::withdrawal(&account, amount, now))
            .await?;
        tx.commit().await?;

        info!(account_number = %number, amount = %amount, balance = %balance_after, "withdrawal committed");
        Ok(CashReceipt {
            account_number: account.account_number,
            account_name: account.account_name,
            balance_before: Direction::Increase.apply(balance_after, amount)?,
            amount,
            balance_after,
            transaction_date: entry.transaction_time,
            entry,
        })
    }

    #[instrument(
        skip_all,
        fields(operation = "transfer", account_number = %cmd.from_account_number),
        err
    )]
    pub async fn transfer(&self, cmd: Transfer) -> DomainResult<TransferReceipt> {
        let (from, to, amount, pin) = cmd.validate()?;
        let sender = self.store.find_by_number(&from).await?;
        self.authenticate(&sender, &pin, PinGuard::STANDARD).await?;

        if sender.balance < amount {
            return Err(DomainError::below_minimum("Insufficient balance"));
        }

        let receiver = match self.store.find_by_number(&to).await {
            Ok(account) => account,
            Err(StoreError::NotFound(_)) => {
                return Err(DomainError::not_found("Beneficiary account"));
            }
            Err(err) => return Err(err.into()),
        };

        let now = Utc::now();
        let (debit, credit) = NewLedgerEntry::transfer(&sender, &receiver, amount, now);

        let mut tx = self.store.begin().await?;
        let from_balance_after = tx
            .adjust_balance(sender.id, amount, Direction::Decrease)
            .await?;
        if from_balance_after.is_negative() {
            abort(tx).await;
            warn!(account_number = %from, amount = %amount, "transfer would overdraw sender, rolled back");
            return Err(DomainError::below_minimum(
                "Sender balance would be negative after transfer",
            ));
        }
        tx.append_entry(debit).await?;
        let to_balance_after = tx
            .adjust_balance(receiver.id, amount, Direction::Increase)
            .await?;
        tx.append_entry(credit).await?;
        tx.commit().await?;

        info!(
            account_number = %from,
            beneficiary = %to,
            amount = %amount,
            "transfer committed"
        );
        Ok(TransferReceipt {
            from_account_number: sender.account_number,
            to_account_number: receiver.account_number,
            amount,
            from_balance_before: Direction::Increase.apply(from_balance_after, amount)?,
            from_balance_after,
            to_balance_before: Direction::Decrease.apply(to_balance_after, amount)?,
            to_balance_after,
            transaction_date: now,
        })
    }

    #[instrument(skip_all, fields(operation = "check_balance", account_number = %cmd.account_number), err)]
    pub async fn check_balance(&self, cmd: CheckBalance) -> DomainResult<BalanceInquiry> {
        let (number, pin) = cmd.validate()?;
        let account = self.store.find_by_number(&number).await?;
        self.authenticate(&account, &pin, PinGuard::STANDARD).await?;

        Ok(BalanceInquiry {
            account_number: account.account_number,
            account_name: account.account_name,
            balance: account.balance,
        })
    }

    #[instrument(skip_all, fields(operation = "change_pin", account_number = %cmd.account_number), err)]
    pub async fn change_pin(&self, cmd: ChangePin) -> DomainResult<PinChanged> {
        let (number, old, new) = cmd.validate()?;
        let account = self.store.find_by_number(&number).await?;
        self.authenticate(&account, &old, PinGuard::PIN_CHANGE).await?;

        let pin_hash = hash_pin(new).await?;
        self.store.replace_pin(account.id, &pin_hash).await?;

        info!(account_number = %number, "PIN changed");
        Ok(PinChanged {
            account_number: account.account_number,
            changed_at: Utc::now(),
        })
    }

    /// Issue a reset token for an existing account. Works on blocked accounts.
    #[instrument(skip_all, fields(operation = "forgot_pin", account_number = %account_number), err)]
    pub async fn forgot_pin(&self, account_number: &str) -> DomainResult<ResetGrant> {
        let number = AccountNumber::parse(account_number)?;
        let account = self.store.find_by_number(&number).await?;

        let grant = ResetGrant::issue(account.account_number, Utc::now(), self.reset_ttl)?;
        self.tokens
            .put(&grant.reset_token, &grant.account_number, self.reset_ttl)
            .await?;

        info!(account_number = %number, expires_at = %grant.expires_at, "reset token issued");
        Ok(grant)
    }

    #[instrument(skip_all, fields(operation = "reset_pin"), err)]
    pub async fn reset_pin(&self, cmd: ResetPin) -> DomainResult<PinReset> {
        let (token, new) = cmd.validate()?;
        let number = self
            .tokens
            .get(&token)
            .await?
            .ok_or_else(|| DomainError::forbidden("Invalid or expired reset token"))?;

        let account = self.store.find_by_number(&number).await?;
        let pin_hash = hash_pin(new).await?;
        self.store.replace_pin(account.id, &pin_hash).await?;

        if let Err(err) = self.tokens.delete(&token).await {
            warn!(account_number = %number, error = %err, "failed to delete used reset token");
        }

        info!(account_number = %number, "PIN reset");
        Ok(PinReset {
            account_number: account.account_number,
            reset_at: Utc::now(),
        })
    }

    #[instrument(skip(self), fields(operation = "get_account"), err)]
    pub async fn get_account(&self, id: i64) -> DomainResult<Account> {
        let id = AccountId::new(id)?;
        Ok(self.store.find_by_id(id).await?)
    }

    #[instrument(skip(self), fields(operation = "list_accounts"), err)]
    pub async fn list_accounts(&self) -> DomainResult<Vec<Account>> {
        Ok(self.store.list().await?)
    }

    #[instrument(skip_all, fields(operation = "rename_account", id = cmd.id), err)]
    pub async fn rename_account(&self, cmd: RenameAccount) -> DomainResult<Account> {
        let (id, name) = cmd.validate()?;
        let account = self.store.rename(id, &name).await?;
        info!(account_number = %account.account_number, "account renamed");
        Ok(account)
    }

    /// Soft delete. Refused while the balance is positive. Returns the
    /// account as it was before deletion.
    #[instrument(skip(self), fields(operation = "delete_account"), err)]
    pub async fn delete_account(&self, id: i64) -> DomainResult<Account> {
        let id = AccountId::new(id)?;
        let account = self.store.find_by_id(id).await?;
        if account.balance.is_positive() {
            return Err(DomainError::validation(
                "account with a positive balance cannot be deleted",
            ));
        }
        self.store.soft_delete(id).await?;
        info!(account_number = %account.account_number, "account deleted");
        Ok(account)
    }

    #[instrument(skip_all, fields(operation = "transaction_history"), err)]
    pub async fn history(&self, cmd: TransactionHistory) -> DomainResult<HistoryResult> {
        let query = cmd.validate()?;
        if let Some(number) = &query.account_number {
            self.store.find_by_number(number).await?;
        }

        let page = self.store.history(&query).await?;
        let pagination = query.pagination.map(|p| PageMeta {
            current_page: p.page,
            per_page: p.limit,
            total_pages: p.total_pages(page.total_records),
        });
        Ok(HistoryResult {
            entries: page.entries,
            total_records: page.total_records,
            pagination,
        })
    }

    #[instrument(skip(self), fields(operation = "transaction_detail"), err)]
    pub async fn transaction_detail(&self, id: i64) -> DomainResult<LedgerEntry> {
        let id = TransactionId::new(id)?;
        Ok(self.store.find_entry(id).await?)
    }

    /// Run the PIN guard and persist its side effects on the counter.
    async fn authenticate(&self, account: &Account, pin: &Pin, guard: PinGuard) -> DomainResult<()> {
        let verdict = {
            let account = account.clone();
            let pin = pin.clone();
            tokio::task::spawn_blocking(move || guard.check(&account, &pin))
                .await
                .map_err(|e| DomainError::system(format!("PIN verification task failed: {e}")))?
        };
        match verdict {
            PinVerdict::Blocked => {
                warn!(account_number = %account.account_number, "PIN-gated call on blocked account");
                Err(guard.blocked_error())
            }
            PinVerdict::Rejected => {
                let failed = self.store.record_failed_pin(account.id).await?;
                warn!(
                    account_number = %account.account_number,
                    failed_attempts = failed,
                    "invalid PIN"
                );
                Err(PinGuard::failure_error(failed))
            }
            PinVerdict::Accepted { reset_counter } => {
                if reset_counter {
                    self.store.clear_failed_pins(account.id).await?;
                }
                Ok(())
            }
        }
    }
}

async fn hash_pin(pin: Pin) -> DomainResult<PinHash> {
    tokio::task::spawn_blocking(move || pin.hash())
        .await
        .map_err(|e| DomainError::system(format!("PIN hashing task failed: {e}")))?
}

/// Roll back a refused transaction. A failed rollback is only logged: the
/// transaction is dropped either way and the caller reports the refusal.
async fn abort(tx: Box<dyn LedgerTx>) {
    if let Err(err) = tx.rollback().await {
        warn!(error = %err, "rollback failed");
    }
}
