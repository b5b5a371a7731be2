//! Postgres-backed account store and ledger.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique violation) | `23505` | `Conflict` |
//! | Database (check constraint violation) | `23514` | `Validation` |
//! | Database (other) | any other | `Database` |
//! | RowNotFound | N/A | `NotFound` |
//! | PoolClosed / PoolTimedOut / Io | N/A | `Unavailable` |
//! | Other | N/A | `Database` |
//!
//! Balance arithmetic happens in SQL (`ROUND(balance ± $1, 2)`) so concurrent
//! adjustments of one row serialize on the row lock instead of racing on a
//! value read earlier.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::{Span, instrument};

use pinledger_accounting::{
    Account, AccountStatus, Direction, HistoryPage, HistoryQuery, LedgerEntry, MAX_PIN_ATTEMPTS,
    NewAccount, NewLedgerEntry, PinHash,
};
use pinledger_core::{AccountId, AccountNumber, Money, TransactionId};

use super::r#trait::{AccountStore, LedgerStore, LedgerTx, StoreError, ensure_positive};

const ACCOUNT_COLUMNS: &str = "id, account_number, account_name, balance, pin_hash, status, \
     failed_pin_attempts, created_at, updated_at, deleted_at";

const ENTRY_COLUMNS: &str = "id, account_id, account_number, account_name, source_number, \
     beneficiary_number, transaction_type, amount, transaction_time, created_at";

// One statement per direction; the operator is never spliced into SQL.
const INCREASE_BALANCE: &str = r#"
    UPDATE account
    SET balance = ROUND((balance + $1)::numeric, 2), updated_at = NOW()
    WHERE id = $2 AND deleted_at IS NULL
    RETURNING balance
"#;

const DECREASE_BALANCE: &str = r#"
    UPDATE account
    SET balance = ROUND((balance - $1)::numeric, 2), updated_at = NOW()
    WHERE id = $2 AND deleted_at IS NULL
    RETURNING balance
"#;

/// Postgres account store and ledger over a shared pool.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: Arc<PgPool>,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Close the pool, waiting for checked-out connections to return.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn fetch_account(&self, sql: &str, operation: &str, bind: AccountKey<'_>) -> Result<Account, StoreError> {
        let query = sqlx::query(sql);
        let query = match bind {
            AccountKey::Id(id) => query.bind(id.get()),
            AccountKey::Number(number) => query.bind(number.as_str()),
        };
        let row = query
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error(operation, e))?
            .ok_or_else(|| StoreError::NotFound("Account".to_string()))?;
        account_from_row(&row)
    }
}

enum AccountKey<'a> {
    Id(AccountId),
    Number(&'a AccountNumber),
}

#[async_trait]
impl AccountStore for PostgresStore {
    #[instrument(skip(self, account), fields(account_number = %account.account_number), err)]
    async fn insert(&self, account: NewAccount) -> Result<Account, StoreError> {
        let sql = format!(
            r#"
            INSERT INTO account (
                account_number, account_name, balance, pin_hash,
                status, failed_pin_attempts, created_at, updated_at
            )
            VALUES ($1, $2, ROUND($3::numeric, 2), $4, 'ACTIVE', 0, NOW(), NOW())
            RETURNING {ACCOUNT_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(account.account_number.as_str())
            .bind(&account.account_name)
            .bind(account.balance.amount())
            .bind(account.pin_hash.as_str())
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    StoreError::Conflict(format!(
                        "account number {} already exists",
                        account.account_number
                    ))
                } else {
                    map_sqlx_error("insert_account", e)
                }
            })?;
        account_from_row(&row)
    }

    #[instrument(skip(self), fields(account_id = %id), err)]
    async fn find_by_id(&self, id: AccountId) -> Result<Account, StoreError> {
        let sql = format!(
            "SELECT {ACCOUNT_COLUMNS} FROM account WHERE id = $1 AND deleted_at IS NULL"
        );
        self.fetch_account(&sql, "find_account_by_id", AccountKey::Id(id))
            .await
    }

    #[instrument(skip(self), fields(account_number = %number), err)]
    async fn find_by_number(&self, number: &AccountNumber) -> Result<Account, StoreError> {
        let sql = format!(
            "SELECT {ACCOUNT_COLUMNS} FROM account WHERE account_number = $1 AND deleted_at IS NULL"
        );
        self.fetch_account(&sql, "find_account_by_number", AccountKey::Number(number))
            .await
    }

    #[instrument(skip(self), fields(account_number = %number), err)]
    async fn exists_by_number(&self, number: &AccountNumber) -> Result<bool, StoreError> {
        let row = sqlx::query(
            "SELECT EXISTS (SELECT 1 FROM account WHERE account_number = $1) AS taken",
        )
        .bind(number.as_str())
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("exists_by_number", e))?;
        row.try_get("taken")
            .map_err(|e| corrupt_row("exists_by_number", e))
    }

    #[instrument(skip(self), fields(account_count = tracing::field::Empty), err)]
    async fn list(&self) -> Result<Vec<Account>, StoreError> {
        let sql = format!(
            "SELECT {ACCOUNT_COLUMNS} FROM account WHERE deleted_at IS NULL \
             ORDER BY created_at DESC, id DESC"
        );
        let rows = sqlx::query(&sql)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_accounts", e))?;
        let accounts = rows
            .iter()
            .map(account_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Span::current().record("account_count", accounts.len());
        Ok(accounts)
    }

    #[instrument(skip(self), fields(account_id = %id), err)]
    async fn rename(&self, id: AccountId, account_name: &str) -> Result<Account, StoreError> {
        let sql = format!(
            r#"
            UPDATE account SET account_name = $2, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING {ACCOUNT_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(id.get())
            .bind(account_name)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("rename_account", e))?
            .ok_or_else(|| StoreError::NotFound("Account".to_string()))?;
        account_from_row(&row)
    }

    #[instrument(skip(self), fields(account_id = %id), err)]
    async fn record_failed_pin(&self, id: AccountId) -> Result<u32, StoreError> {
        let row = sqlx::query(
            r#"
            UPDATE account
            SET failed_pin_attempts = failed_pin_attempts + 1,
                status = CASE WHEN failed_pin_attempts + 1 >= $2 THEN 'BLOCKED_PIN' ELSE status END,
                updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING failed_pin_attempts
            "#,
        )
        .bind(id.get())
        .bind(MAX_PIN_ATTEMPTS as i32)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("record_failed_pin", e))?
        .ok_or_else(|| StoreError::NotFound("Account".to_string()))?;

        let attempts: i32 = row
            .try_get("failed_pin_attempts")
            .map_err(|e| corrupt_row("record_failed_pin", e))?;
        Ok(attempts.max(0) as u32)
    }

    #[instrument(skip(self), fields(account_id = %id), err)]
    async fn clear_failed_pins(&self, id: AccountId) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE account SET failed_pin_attempts = 0, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id.get())
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("clear_failed_pins", e))?;
        expect_one_row(result.rows_affected())
    }

    #[instrument(skip(self, pin_hash), fields(account_id = %id), err)]
    async fn replace_pin(&self, id: AccountId, pin_hash: &PinHash) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE account
            SET pin_hash = $2, failed_pin_attempts = 0, status = 'ACTIVE', updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id.get())
        .bind(pin_hash.as_str())
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("replace_pin", e))?;
        expect_one_row(result.rows_affected())
    }

    #[instrument(skip(self), fields(account_id = %id), err)]
    async fn soft_delete(&self, id: AccountId) -> Result<(), StoreError> {
        let row = sqlx::query("SELECT balance FROM account WHERE id = $1 AND deleted_at IS NULL")
            .bind(id.get())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("soft_delete", e))?
            .ok_or_else(|| StoreError::NotFound("Account".to_string()))?;
        let balance: Decimal = row
            .try_get("balance")
            .map_err(|e| corrupt_row("soft_delete", e))?;
        if Money::new(balance).is_positive() {
            return Err(balance_not_zero());
        }

        // balance re-checked in the UPDATE in case a deposit landed in between
        let result = sqlx::query(
            r#"
            UPDATE account SET deleted_at = NOW(), updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL AND balance <= 0
            "#,
        )
        .bind(id.get())
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("soft_delete", e))?;
        if result.rows_affected() == 0 {
            return Err(balance_not_zero());
        }
        Ok(())
    }
}

#[async_trait]
impl LedgerStore for PostgresStore {
    #[instrument(skip(self), err)]
    async fn begin(&self) -> Result<Box<dyn LedgerTx>, StoreError> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;
        Ok(Box::new(PostgresTx { tx }))
    }

    #[instrument(skip(self), fields(transaction_id = %id), err)]
    async fn find_entry(&self, id: TransactionId) -> Result<LedgerEntry, StoreError> {
        let sql = format!("SELECT {ENTRY_COLUMNS} FROM transaction WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.get())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_entry", e))?
            .ok_or_else(|| StoreError::NotFound("Transaction".to_string()))?;
        entry_from_row(&row)
    }

    #[instrument(
        skip(self, query),
        fields(
            account_number = ?query.account_number.as_ref().map(AccountNumber::as_str),
            start_date = ?query.start_date,
            end_date = ?query.end_date,
            entry_count = tracing::field::Empty
        ),
        err
    )]
    async fn history(&self, query: &HistoryQuery) -> Result<HistoryPage, StoreError> {
        let span = Span::current();

        let account_number = query.account_number.as_ref().map(AccountNumber::as_str);

        // NULL parameters disable their filter, keeping a single parameterized query
        let count_row = sqlx::query(
            r#"
            SELECT COUNT(*) AS total
            FROM transaction
            WHERE ($1::text IS NULL OR account_number = $1)
              AND ($2::date IS NULL OR (transaction_time AT TIME ZONE 'UTC')::date >= $2)
              AND ($3::date IS NULL OR (transaction_time AT TIME ZONE 'UTC')::date <= $3)
            "#,
        )
        .bind(account_number)
        .bind(query.start_date)
        .bind(query.end_date)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("count_history", e))?;
        let total: i64 = count_row
            .try_get("total")
            .map_err(|e| corrupt_row("count_history", e))?;

        // LIMIT NULL means no limit; OFFSET NULL means zero
        let limit = query.pagination.map(|p| i64::from(p.limit));
        let offset = query.pagination.map(|p| p.offset() as i64);

        let sql = format!(
            r#"
            SELECT {ENTRY_COLUMNS}
            FROM transaction
            WHERE ($1::text IS NULL OR account_number = $1)
              AND ($2::date IS NULL OR (transaction_time AT TIME ZONE 'UTC')::date >= $2)
              AND ($3::date IS NULL OR (transaction_time AT TIME ZONE 'UTC')::date <= $3)
            ORDER BY transaction_time DESC, id DESC
            LIMIT $4 OFFSET $5
            "#
        );
        let rows = sqlx::query(&sql)
            .bind(account_number)
            .bind(query.start_date)
            .bind(query.end_date)
            .bind(limit)
            .bind(offset)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("load_history", e))?;

        let entries = rows
            .iter()
            .map(entry_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        span.record("entry_count", entries.len());

        Ok(HistoryPage {
            entries,
            total_records: total.max(0) as u64,
        })
    }
}

/// A running Postgres transaction. Dropping it without `commit` rolls back.
struct PostgresTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl LedgerTx for PostgresTx {
    #[instrument(skip(self, amount), fields(account_id = %id, amount = %amount), err)]
    async fn adjust_balance(
        &mut self,
        id: AccountId,
        amount: Money,
        direction: Direction,
    ) -> Result<Money, StoreError> {
        ensure_positive(amount)?;
        let sql = match direction {
            Direction::Increase => INCREASE_BALANCE,
            Direction::Decrease => DECREASE_BALANCE,
        };
        let row = sqlx::query(sql)
            .bind(amount.amount())
            .bind(id.get())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("adjust_balance", e))?
            .ok_or_else(|| StoreError::NotFound("Account".to_string()))?;
        let balance: Decimal = row
            .try_get("balance")
            .map_err(|e| corrupt_row("adjust_balance", e))?;
        Ok(Money::new(balance))
    }

    #[instrument(
        skip(self, entry),
        fields(
            account_number = %entry.account_number,
            transaction_type = entry.transaction_type.code(),
            amount = %entry.amount
        ),
        err
    )]
    async fn append_entry(&mut self, entry: NewLedgerEntry) -> Result<LedgerEntry, StoreError> {
        ensure_positive(entry.amount)?;
        let sql = format!(
            r#"
            INSERT INTO transaction (
                account_id, account_number, account_name, source_number,
                beneficiary_number, transaction_type, amount, transaction_time, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NOW())
            RETURNING {ENTRY_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(entry.account_id.get())
            .bind(entry.account_number.as_str())
            .bind(&entry.account_name)
            .bind(entry.source_number.as_str())
            .bind(entry.beneficiary_number.as_str())
            .bind(entry.transaction_type.code())
            .bind(entry.amount.amount())
            .bind(entry.transaction_time)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("append_entry", e))?;
        entry_from_row(&row)
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx
            .commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        self.tx
            .rollback()
            .await
            .map_err(|e| map_sqlx_error("rollback", e))
    }
}

fn balance_not_zero() -> StoreError {
    StoreError::Validation("account balance must be zero before deletion".to_string())
}

fn expect_one_row(rows_affected: u64) -> Result<(), StoreError> {
    if rows_affected == 0 {
        Err(StoreError::NotFound("Account".to_string()))
    } else {
        Ok(())
    }
}

fn corrupt_row(operation: &str, err: sqlx::Error) -> StoreError {
    StoreError::Database(format!("failed to decode row in {operation}: {err}"))
}

/// Map SQLx errors to StoreError.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => StoreError::Conflict(msg),
                Some("23514") => StoreError::Validation(msg),
                // numeric_value_out_of_range
                Some("22003") => StoreError::Validation(msg),
                _ => StoreError::Database(msg),
            }
        }
        sqlx::Error::RowNotFound => StoreError::NotFound("Row".to_string()),
        sqlx::Error::PoolClosed => {
            StoreError::Unavailable(format!("connection pool closed in {operation}"))
        }
        sqlx::Error::PoolTimedOut => {
            StoreError::Unavailable(format!("timed out acquiring a connection in {operation}"))
        }
        sqlx::Error::Io(e) => StoreError::Unavailable(format!("io error in {operation}: {e}")),
        other => StoreError::Database(format!("sqlx error in {operation}: {other}")),
    }
}

/// Check if an error is a unique constraint violation.
fn is_unique_violation(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        if let Some(code) = db_err.code() {
            return code.as_ref() == "23505";
        }
    }
    false
}

// Row decoding

fn account_from_row(row: &PgRow) -> Result<Account, StoreError> {
    let decode = |e: sqlx::Error| corrupt_row("account_row", e);
    let invalid = |e: pinledger_core::DomainError| {
        StoreError::Database(format!("invalid account row: {e}"))
    };

    let id: i64 = row.try_get("id").map_err(decode)?;
    let number: String = row.try_get("account_number").map_err(decode)?;
    let balance: Decimal = row.try_get("balance").map_err(decode)?;
    let pin_hash: String = row.try_get("pin_hash").map_err(decode)?;
    let status: String = row.try_get("status").map_err(decode)?;
    let failed: i32 = row.try_get("failed_pin_attempts").map_err(decode)?;
    let created_at: DateTime<Utc> = row.try_get("created_at").map_err(decode)?;
    let updated_at: DateTime<Utc> = row.try_get("updated_at").map_err(decode)?;
    let deleted_at: Option<DateTime<Utc>> = row.try_get("deleted_at").map_err(decode)?;

    Ok(Account {
        id: AccountId::new(id).map_err(invalid)?,
        account_number: AccountNumber::parse(number).map_err(invalid)?,
        account_name: row.try_get("account_name").map_err(decode)?,
        balance: Money::new(balance),
        pin_hash: PinHash::from_stored(pin_hash),
        status: status.parse::<AccountStatus>().map_err(invalid)?,
        failed_pin_attempts: failed.max(0) as u32,
        created_at,
        updated_at,
        deleted_at,
    })
}

fn entry_from_row(row: &PgRow) -> Result<LedgerEntry, StoreError> {
    let decode = |e: sqlx::Error| corrupt_row("transaction_row", e);
    let invalid = |e: pinledger_core::DomainError| {
        StoreError::Database(format!("invalid transaction row: {e}"))
    };
    let number = |column: &str| -> Result<AccountNumber, StoreError> {
        let raw: String = row.try_get(column).map_err(decode)?;
        AccountNumber::parse(raw).map_err(invalid)
    };

    let id: i64 = row.try_get("id").map_err(decode)?;
    let account_id: i64 = row.try_get("account_id").map_err(decode)?;
    let transaction_type: String = row.try_get("transaction_type").map_err(decode)?;
    let amount: Decimal = row.try_get("amount").map_err(decode)?;

    Ok(LedgerEntry {
        id: TransactionId::new(id).map_err(invalid)?,
        account_id: AccountId::new(account_id).map_err(invalid)?,
        account_number: number("account_number")?,
        account_name: row.try_get("account_name").map_err(decode)?,
        source_number: number("source_number")?,
        beneficiary_number: number("beneficiary_number")?,
        transaction_type: transaction_type.parse().map_err(invalid)?,
        amount: Money::new(amount),
        transaction_time: row.try_get("transaction_time").map_err(decode)?,
        created_at: row.try_get("created_at").map_err(decode)?,
    })
}
