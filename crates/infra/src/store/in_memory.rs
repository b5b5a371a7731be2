use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use pinledger_accounting::{
    Account, AccountStatus, Direction, HistoryPage, HistoryQuery, LedgerEntry, NewAccount,
    NewLedgerEntry, PinHash, guard,
};
use pinledger_core::{AccountId, AccountNumber, Money, TransactionId};

use super::r#trait::{AccountStore, LedgerStore, LedgerTx, StoreError, ensure_positive};

#[derive(Debug, Clone, Default)]
struct State {
    accounts: BTreeMap<AccountId, Account>,
    entries: Vec<LedgerEntry>,
    last_account_id: i64,
    last_entry_id: i64,
    #[cfg(test)]
    fail_append_after: Option<usize>,
    #[cfg(test)]
    faults: Faults,
}

/// Test-only fault injection beyond failed appends.
#[cfg(test)]
#[derive(Debug, Clone, Default)]
struct Faults {
    /// Number checks still to report "taken" regardless of the data.
    taken_numbers: usize,
    /// Inserts still to fail with a conflict.
    insert_conflicts: usize,
    /// Debit applied as if committed by another caller right before the next
    /// transaction starts.
    concurrent_debit: Option<(AccountId, Money)>,
    /// Make explicit rollbacks report failure (the snapshot is still restored).
    fail_rollback: bool,
    number_checks: usize,
}

impl State {
    fn live(&self, id: AccountId) -> Result<&Account, StoreError> {
        self.accounts
            .get(&id)
            .filter(|a| a.deleted_at.is_none())
            .ok_or_else(|| StoreError::NotFound("Account".to_string()))
    }

    fn live_mut(&mut self, id: AccountId) -> Result<&mut Account, StoreError> {
        self.accounts
            .get_mut(&id)
            .filter(|a| a.deleted_at.is_none())
            .ok_or_else(|| StoreError::NotFound("Account".to_string()))
    }
}

fn serial<T>(last: &mut i64, wrap: fn(i64) -> Result<T, pinledger_core::DomainError>) -> Result<T, StoreError> {
    *last += 1;
    wrap(*last).map_err(|e| StoreError::Database(e.to_string()))
}

/// In-memory account store and ledger.
///
/// Intended for tests/dev. A [`LedgerTx`] holds the state lock for its whole
/// lifetime, so transactions are serialized and callers must not use the
/// store from the same task while one is open.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<State>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the `n`th ledger append from now on fail (0 = the next one).
    #[cfg(test)]
    pub(crate) async fn fail_append_after(&self, n: usize) {
        self.state.lock().await.fail_append_after = Some(n);
    }

    /// Report the next `n` account numbers as taken.
    #[cfg(test)]
    pub(crate) async fn report_numbers_taken(&self, n: usize) {
        self.state.lock().await.faults.taken_numbers = n;
    }

    /// Fail the next `n` inserts with a unique-number conflict.
    #[cfg(test)]
    pub(crate) async fn conflict_next_inserts(&self, n: usize) {
        self.state.lock().await.faults.insert_conflicts = n;
    }

    /// Debit `amount` from `id` just before the next transaction begins, after
    /// the caller has already loaded its snapshot.
    #[cfg(test)]
    pub(crate) async fn debit_before_next_tx(&self, id: AccountId, amount: Money) {
        self.state.lock().await.faults.concurrent_debit = Some((id, amount));
    }

    #[cfg(test)]
    pub(crate) async fn fail_rollbacks(&self) {
        self.state.lock().await.faults.fail_rollback = true;
    }

    /// Account-number existence checks made so far.
    #[cfg(test)]
    pub(crate) async fn number_checks(&self) -> usize {
        self.state.lock().await.faults.number_checks
    }
}

#[async_trait]
impl AccountStore for InMemoryStore {
    async fn insert(&self, account: NewAccount) -> Result<Account, StoreError> {
        let mut state = self.state.lock().await;
        #[cfg(test)]
        if state.faults.insert_conflicts > 0 {
            state.faults.insert_conflicts -= 1;
            return Err(StoreError::Conflict("injected conflict".to_string()));
        }
        if state
            .accounts
            .values()
            .any(|a| a.account_number == account.account_number)
        {
            return Err(StoreError::Conflict(format!(
                "account number {} already exists",
                account.account_number
            )));
        }

        let id = serial(&mut state.last_account_id, AccountId::new)?;
        let now = Utc::now();
        let created = Account {
            id,
            account_number: account.account_number,
            account_name: account.account_name,
            balance: account.balance,
            pin_hash: account.pin_hash,
            status: AccountStatus::Active,
            failed_pin_attempts: 0,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        state.accounts.insert(id, created.clone());
        Ok(created)
    }

    async fn find_by_id(&self, id: AccountId) -> Result<Account, StoreError> {
        self.state.lock().await.live(id).cloned()
    }

    async fn find_by_number(&self, number: &AccountNumber) -> Result<Account, StoreError> {
        let state = self.state.lock().await;
        state
            .accounts
            .values()
            .find(|a| a.deleted_at.is_none() && &a.account_number == number)
            .cloned()
            .ok_or_else(|| StoreError::NotFound("Account".to_string()))
    }

    async fn exists_by_number(&self, number: &AccountNumber) -> Result<bool, StoreError> {
        #[allow(unused_mut)]
        let mut state = self.state.lock().await;
        #[cfg(test)]
        {
            state.faults.number_checks += 1;
            if state.faults.taken_numbers > 0 {
                state.faults.taken_numbers -= 1;
                return Ok(true);
            }
        }
        Ok(state.accounts.values().any(|a| &a.account_number == number))
    }

    async fn list(&self) -> Result<Vec<Account>, StoreError> {
        let state = self.state.lock().await;
        let mut accounts: Vec<Account> = state
            .accounts
            .values()
            .filter(|a| a.deleted_at.is_none())
            .cloned()
            .collect();
        accounts.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(accounts)
    }

    async fn rename(&self, id: AccountId, account_name: &str) -> Result<Account, StoreError> {
        let mut state = self.state.lock().await;
        let account = state.live_mut(id)?;
        account.account_name = account_name.to_string();
        account.updated_at = Utc::now();
        Ok(account.clone())
    }

    async fn record_failed_pin(&self, id: AccountId) -> Result<u32, StoreError> {
        let mut state = self.state.lock().await;
        let account = state.live_mut(id)?;
        account.failed_pin_attempts += 1;
        if guard::status_after_failures(account.failed_pin_attempts) == AccountStatus::BlockedPin {
            account.status = AccountStatus::BlockedPin;
        }
        account.updated_at = Utc::now();
        Ok(account.failed_pin_attempts)
    }

    async fn clear_failed_pins(&self, id: AccountId) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        let account = state.live_mut(id)?;
        account.failed_pin_attempts = 0;
        account.updated_at = Utc::now();
        Ok(())
    }

    async fn replace_pin(&self, id: AccountId, pin_hash: &PinHash) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        let account = state.live_mut(id)?;
        account.pin_hash = pin_hash.clone();
        account.failed_pin_attempts = 0;
        account.status = AccountStatus::Active;
        account.updated_at = Utc::now();
        Ok(())
    }

    async fn soft_delete(&self, id: AccountId) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        let account = state.live_mut(id)?;
        if account.balance.is_positive() {
            return Err(StoreError::Validation(
                "account balance must be zero before deletion".to_string(),
            ));
        }
        let now = Utc::now();
        account.deleted_at = Some(now);
        account.updated_at = now;
        Ok(())
    }
}

#[async_trait]
impl LedgerStore for InMemoryStore {
    async fn begin(&self) -> Result<Box<dyn LedgerTx>, StoreError> {
        #[allow(unused_mut)]
        let mut guard = self.state.clone().lock_owned().await;
        #[cfg(test)]
        if let Some((id, amount)) = guard.faults.concurrent_debit.take() {
            let account = guard.live_mut(id)?;
            account.balance = account
                .balance
                .checked_sub(amount)
                .map_err(|e| StoreError::Validation(e.to_string()))?;
        }
        let snapshot = guard.clone();
        Ok(Box::new(InMemoryTx {
            guard,
            snapshot: Some(snapshot),
        }))
    }

    async fn find_entry(&self, id: TransactionId) -> Result<LedgerEntry, StoreError> {
        let state = self.state.lock().await;
        state
            .entries
            .iter()
            .find(|e| e.id == id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound("Transaction".to_string()))
    }

    async fn history(&self, query: &HistoryQuery) -> Result<HistoryPage, StoreError> {
        let state = self.state.lock().await;
        let mut matching: Vec<&LedgerEntry> =
            state.entries.iter().filter(|e| query.matches(e)).collect();
        matching.sort_by(|a, b| {
            b.transaction_time
                .cmp(&a.transaction_time)
                .then(b.id.cmp(&a.id))
        });

        let total_records = matching.len() as u64;
        let entries = match query.pagination {
            Some(p) => matching
                .into_iter()
                .skip(p.offset() as usize)
                .take(p.limit as usize)
                .cloned()
                .collect(),
            None => matching.into_iter().cloned().collect(),
        };
        Ok(HistoryPage {
            entries,
            total_records,
        })
    }
}

/// Holds the store lock; restores the snapshot on drop unless committed.
struct InMemoryTx {
    guard: OwnedMutexGuard<State>,
    snapshot: Option<State>,
}

#[async_trait]
impl LedgerTx for InMemoryTx {
    async fn adjust_balance(
        &mut self,
        id: AccountId,
        amount: Money,
        direction: Direction,
    ) -> Result<Money, StoreError> {
        ensure_positive(amount)?;
        let account = self.guard.live_mut(id)?;
        let balance = direction
            .apply(account.balance, amount)
            .map_err(|e| StoreError::Validation(e.to_string()))?;
        // same limit as the NUMERIC(18,2) column
        if !balance.is_storable() {
            return Err(StoreError::Validation("balance out of range".to_string()));
        }
        account.balance = balance;
        account.updated_at = Utc::now();
        Ok(account.balance)
    }

    async fn append_entry(&mut self, entry: NewLedgerEntry) -> Result<LedgerEntry, StoreError> {
        ensure_positive(entry.amount)?;
        #[cfg(test)]
        if let Some(n) = self.guard.fail_append_after {
            if n == 0 {
                self.guard.fail_append_after = None;
                return Err(StoreError::Database("injected append failure".to_string()));
            }
            self.guard.fail_append_after = Some(n - 1);
        }
        self.guard.live(entry.account_id)?;

        let id = serial(&mut self.guard.last_entry_id, TransactionId::new)?;
        let stored = LedgerEntry {
            id,
            account_id: entry.account_id,
            account_number: entry.account_number,
            account_name: entry.account_name,
            source_number: entry.source_number,
            beneficiary_number: entry.beneficiary_number,
            transaction_type: entry.transaction_type,
            amount: entry.amount,
            transaction_time: entry.transaction_time,
            created_at: Utc::now(),
        };
        self.guard.entries.push(stored.clone());
        Ok(stored)
    }

    async fn commit(mut self: Box<Self>) -> Result<(), StoreError> {
        self.snapshot = None;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        #[cfg(test)]
        if self.guard.faults.fail_rollback {
            return Err(StoreError::Unavailable("injected rollback failure".to_string()));
        }
        Ok(())
    }
}

impl Drop for InMemoryTx {
    fn drop(&mut self) {
        if let Some(snapshot) = self.snapshot.take() {
            #[cfg(test)]
            let fault = self.guard.fail_append_after;
            *self.guard = snapshot;
            #[cfg(test)]
            {
                self.guard.fail_append_after = fault;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pinledger_accounting::{Pagination, Pin};

    fn new_account(number: &str, balance: i64) -> NewAccount {
        NewAccount::new(
            AccountNumber::parse(number).unwrap(),
            "Test Holder".into(),
            Money::from_major(balance),
            Pin::parse("123456").unwrap().hash().unwrap(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn duplicate_number_is_a_conflict() {
        let store = InMemoryStore::new();
        store.insert(new_account("1000000001", 0)).await.unwrap();
        let err = store.insert(new_account("1000000001", 0)).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn third_failure_blocks_in_the_same_step() {
        let store = InMemoryStore::new();
        let acc = store.insert(new_account("1000000001", 0)).await.unwrap();

        assert_eq!(store.record_failed_pin(acc.id).await.unwrap(), 1);
        assert_eq!(store.record_failed_pin(acc.id).await.unwrap(), 2);
        assert_eq!(
            store.find_by_id(acc.id).await.unwrap().status,
            AccountStatus::Active
        );
        assert_eq!(store.record_failed_pin(acc.id).await.unwrap(), 3);
        assert_eq!(
            store.find_by_id(acc.id).await.unwrap().status,
            AccountStatus::BlockedPin
        );

        store
            .replace_pin(acc.id, &Pin::parse("999999").unwrap().hash().unwrap())
            .await
            .unwrap();
        let after = store.find_by_id(acc.id).await.unwrap();
        assert_eq!(after.status, AccountStatus::Active);
        assert_eq!(after.failed_pin_attempts, 0);
    }

    #[tokio::test]
    async fn dropped_transaction_rolls_back() {
        let store = InMemoryStore::new();
        let acc = store.insert(new_account("1000000001", 50_000)).await.unwrap();

        {
            let mut tx = store.begin().await.unwrap();
            let after = tx
                .adjust_balance(acc.id, Money::from_major(60_000), Direction::Decrease)
                .await
                .unwrap();
            assert!(after.is_negative());
        }

        assert_eq!(
            store.find_by_id(acc.id).await.unwrap().balance,
            Money::from_major(50_000)
        );
    }

    #[tokio::test]
    async fn committed_transaction_persists_balance_and_entry() {
        let store = InMemoryStore::new();
        let acc = store.insert(new_account("1000000001", 0)).await.unwrap();

        let mut tx = store.begin().await.unwrap();
        tx.adjust_balance(acc.id, Money::from_major(10_000), Direction::Increase)
            .await
            .unwrap();
        let entry = tx
            .append_entry(NewLedgerEntry::deposit(&acc, Money::from_major(10_000), Utc::now()))
            .await
            .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(
            store.find_by_id(acc.id).await.unwrap().balance,
            Money::from_major(10_000)
        );
        assert_eq!(store.find_entry(entry.id).await.unwrap(), entry);
    }

    #[tokio::test]
    async fn adjust_rejects_non_positive_amounts() {
        let store = InMemoryStore::new();
        let acc = store.insert(new_account("1000000001", 0)).await.unwrap();
        let mut tx = store.begin().await.unwrap();
        let err = tx
            .adjust_balance(acc.id, Money::zero(), Direction::Increase)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }

    #[tokio::test]
    async fn adjust_refuses_balances_the_column_cannot_hold() {
        let store = InMemoryStore::new();
        let acc = store.insert(new_account("1000000001", 0)).await.unwrap();

        let mut tx = store.begin().await.unwrap();
        tx.adjust_balance(acc.id, Money::max_storable(), Direction::Increase)
            .await
            .unwrap();
        let err = tx
            .adjust_balance(acc.id, Money::max_storable(), Direction::Increase)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }

    #[tokio::test]
    async fn soft_delete_requires_zero_balance_and_hides_the_row() {
        let store = InMemoryStore::new();
        let rich = store.insert(new_account("1000000001", 1)).await.unwrap();
        let empty = store.insert(new_account("1000000002", 0)).await.unwrap();

        assert!(matches!(
            store.soft_delete(rich.id).await,
            Err(StoreError::Validation(_))
        ));
        store.soft_delete(empty.id).await.unwrap();

        assert!(matches!(
            store.find_by_id(empty.id).await,
            Err(StoreError::NotFound(_))
        ));
        assert!(store.exists_by_number(&empty.account_number).await.unwrap());
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn history_pages_newest_first() {
        let store = InMemoryStore::new();
        let acc = store.insert(new_account("1000000001", 0)).await.unwrap();
        let base = Utc::now();

        let mut tx = store.begin().await.unwrap();
        for i in 0..5 {
            tx.append_entry(NewLedgerEntry::deposit(
                &acc,
                Money::from_major(10_000 + i),
                base + chrono::Duration::seconds(i),
            ))
            .await
            .unwrap();
        }
        tx.commit().await.unwrap();

        let query = HistoryQuery::new(None, None, None, Pagination::requested(Some(2), Some(2)))
            .unwrap();
        let page = store.history(&query).await.unwrap();
        assert_eq!(page.total_records, 5);
        let amounts: Vec<Money> = page.entries.iter().map(|e| e.amount).collect();
        assert_eq!(amounts, vec![Money::from_major(10_002), Money::from_major(10_001)]);
    }
}
