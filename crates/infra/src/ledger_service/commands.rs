//! Use-case inputs and outputs.
//!
//! Inputs carry raw caller values; `validate` turns them into domain types
//! before any store is touched.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;

use pinledger_accounting::{
    HistoryQuery, LedgerEntry, Pagination, Pin, ResetToken, validate_account_name,
};
use pinledger_core::{AccountId, AccountNumber, DomainError, DomainResult, Money};

/// Smallest amount accepted for deposit, withdrawal and transfer.
pub const MIN_TRANSACTION_AMOUNT: i64 = 10_000;

/// Largest amount accepted for deposit, withdrawal and transfer. Balances are
/// capped separately at [`Money::max_storable`].
pub const MAX_TRANSACTION_AMOUNT: i64 = 9_999_999_999_999_999;

fn transaction_amount(raw: Decimal) -> DomainResult<Money> {
    let amount = Money::new(raw);
    if amount < Money::from_major(MIN_TRANSACTION_AMOUNT) {
        return Err(DomainError::validation(format!(
            "amount must be at least {MIN_TRANSACTION_AMOUNT}"
        )));
    }
    if amount > Money::from_major(MAX_TRANSACTION_AMOUNT) {
        return Err(DomainError::validation(format!(
            "amount must not exceed {MAX_TRANSACTION_AMOUNT}"
        )));
    }
    Ok(amount)
}

fn new_pin_pair(old: &Pin, new: &str) -> DomainResult<Pin> {
    let new = Pin::parse(new)?;
    if &new == old {
        return Err(DomainError::validation("new PIN must differ from the old PIN"));
    }
    Ok(new)
}

#[derive(Debug, Clone)]
pub struct CreateAccount {
    pub account_name: String,
    pub pin: String,
    pub initial_deposit: Decimal,
}

impl CreateAccount {
    pub(crate) fn validate(&self) -> DomainResult<(String, Pin, Money)> {
        let name = validate_account_name(&self.account_name)?;
        let pin = Pin::parse(&self.pin)?;
        let initial = Money::new(self.initial_deposit);
        if initial.is_negative() {
            return Err(DomainError::validation("initial_deposit must not be negative"));
        }
        if !initial.is_storable() {
            return Err(DomainError::validation("initial_deposit is too large"));
        }
        Ok((name, pin, initial))
    }
}

/// Deposit or withdrawal on one's own account.
#[derive(Debug, Clone)]
pub struct CashMovement {
    pub account_number: String,
    pub amount: Decimal,
    pub pin: String,
}

impl CashMovement {
    pub(crate) fn validate(&self) -> DomainResult<(AccountNumber, Money, Pin)> {
        Ok((
            AccountNumber::parse(&self.account_number)?,
            transaction_amount(self.amount)?,
            Pin::parse(&self.pin)?,
        ))
    }
}

#[derive(Debug, Clone)]
pub struct Transfer {
    pub from_account_number: String,
    pub to_account_number: String,
    pub amount: Decimal,
    pub pin: String,
}

impl Transfer {
    pub(crate) fn validate(&self) -> DomainResult<(AccountNumber, AccountNumber, Money, Pin)> {
        let from = AccountNumber::parse(&self.from_account_number)?;
        let to = AccountNumber::parse(&self.to_account_number)?;
        if from == to {
            return Err(DomainError::validation("cannot transfer to the same account"));
        }
        Ok((from, to, transaction_amount(self.amount)?, Pin::parse(&self.pin)?))
    }
}

#[derive(Debug, Clone)]
pub struct CheckBalance {
    pub account_number: String,
    pub pin: String,
}

impl CheckBalance {
    pub(crate) fn validate(&self) -> DomainResult<(AccountNumber, Pin)> {
        Ok((
            AccountNumber::parse(&self.account_number)?,
            Pin::parse(&self.pin)?,
        ))
    }
}

#[derive(Debug, Clone)]
pub struct ChangePin {
    pub account_number: String,
    pub old_pin: String,
    pub new_pin: String,
}

impl ChangePin {
    pub(crate) fn validate(&self) -> DomainResult<(AccountNumber, Pin, Pin)> {
        let number = AccountNumber::parse(&self.account_number)?;
        let old = Pin::parse(&self.old_pin)?;
        let new = new_pin_pair(&old, &self.new_pin)?;
        Ok((number, old, new))
    }
}

#[derive(Debug, Clone)]
pub struct ResetPin {
    pub reset_token: String,
    pub new_pin: String,
    pub confirm_new_pin: String,
}

impl ResetPin {
    pub(crate) fn validate(&self) -> DomainResult<(ResetToken, Pin)> {
        let token = ResetToken::parse(&self.reset_token)?;
        let new = Pin::parse(&self.new_pin)?;
        if self.new_pin != self.confirm_new_pin {
            return Err(DomainError::validation("new PIN and confirmation do not match"));
        }
        Ok((token, new))
    }
}

#[derive(Debug, Clone)]
pub struct RenameAccount {
    pub id: i64,
    pub account_name: String,
}

impl RenameAccount {
    pub(crate) fn validate(&self) -> DomainResult<(AccountId, String)> {
        Ok((AccountId::new(self.id)?, validate_account_name(&self.account_name)?))
    }
}

#[derive(Debug, Clone, Default)]
pub struct TransactionHistory {
    pub account_number: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub limit: Option<u32>,
    pub page: Option<u32>,
}

impl TransactionHistory {
    pub(crate) fn validate(&self) -> DomainResult<HistoryQuery> {
        let account_number = self
            .account_number
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .map(AccountNumber::parse)
            .transpose()?;
        HistoryQuery::new(
            account_number,
            self.start_date,
            self.end_date,
            Pagination::requested(self.page, self.limit),
        )
    }
}

/// Result of a deposit or withdrawal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CashReceipt {
    pub account_number: AccountNumber,
    pub account_name: String,
    pub balance_before: Money,
    pub amount: Money,
    pub balance_after: Money,
    pub transaction_date: DateTime<Utc>,
    pub entry: LedgerEntry,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReceipt {
    pub from_account_number: AccountNumber,
    pub to_account_number: AccountNumber,
    pub amount: Money,
    pub from_balance_before: Money,
    pub from_balance_after: Money,
    pub to_balance_before: Money,
    pub to_balance_after: Money,
    pub transaction_date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceInquiry {
    pub account_number: AccountNumber,
    pub account_name: String,
    pub balance: Money,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinChanged {
    pub account_number: AccountNumber,
    pub changed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinReset {
    pub account_number: AccountNumber,
    pub reset_at: DateTime<Utc>,
}

/// A history page plus the paging metadata when paging was requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryResult {
    pub entries: Vec<LedgerEntry>,
    pub total_records: u64,
    pub pagination: Option<PageMeta>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageMeta {
    pub current_page: u32,
    pub per_page: u32,
    pub total_pages: u64,
}
