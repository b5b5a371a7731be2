//! Ledger entries: the append-only record of balance changes.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use pinledger_core::{
    AccountId, AccountNumber, DomainError, DomainResult, Entity, Money, TransactionId,
};

use crate::account::Account;

/// Side of a ledger entry, stored as its one-letter code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionType {
    /// Money out.
    #[serde(rename = "D")]
    Debit,
    /// Money in.
    #[serde(rename = "C")]
    Credit,
}

impl TransactionType {
    pub fn code(self) -> &'static str {
        match self {
            TransactionType::Debit => "D",
            TransactionType::Credit => "C",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            TransactionType::Debit => "Debit (out)",
            TransactionType::Credit => "Credit (in)",
        }
    }
}

impl core::str::FromStr for TransactionType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "D" => Ok(TransactionType::Debit),
            "C" => Ok(TransactionType::Credit),
            other => Err(DomainError::system(format!("unknown transaction type '{other}'"))),
        }
    }
}

/// Direction of a balance adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Increase,
    Decrease,
}

impl Direction {
    pub fn apply(self, balance: Money, amount: Money) -> DomainResult<Money> {
        match self {
            Direction::Increase => balance.checked_add(amount),
            Direction::Decrease => balance.checked_sub(amount),
        }
    }
}

impl core::str::FromStr for Direction {
    type Err = DomainError;

    /// Only `+` and `-` are accepted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "+" => Ok(Direction::Increase),
            "-" => Ok(Direction::Decrease),
            other => Err(DomainError::validation(format!("invalid direction '{other}'"))),
        }
    }
}

/// A committed ledger row. Immutable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: TransactionId,
    pub account_id: AccountId,
    pub account_number: AccountNumber,
    pub account_name: String,
    pub source_number: AccountNumber,
    pub beneficiary_number: AccountNumber,
    pub transaction_type: TransactionType,
    pub amount: Money,
    pub transaction_time: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    /// Human-readable summary derived from the counterparty numbers.
    pub fn description(&self) -> String {
        match self.transaction_type {
            TransactionType::Debit if self.beneficiary_number != self.account_number => {
                format!("Transfer to {}", self.beneficiary_number)
            }
            TransactionType::Debit => "Cash withdrawal".to_string(),
            TransactionType::Credit if self.source_number != self.account_number => {
                format!("Transfer from {}", self.source_number)
            }
            TransactionType::Credit => "Cash deposit".to_string(),
        }
    }
}

impl Entity for LedgerEntry {
    type Id = TransactionId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Insert payload for a ledger row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLedgerEntry {
    pub account_id: AccountId,
    pub account_number: AccountNumber,
    pub account_name: String,
    pub source_number: AccountNumber,
    pub beneficiary_number: AccountNumber,
    pub transaction_type: TransactionType,
    pub amount: Money,
    pub transaction_time: DateTime<Utc>,
}

impl NewLedgerEntry {
    fn own(
        account: &Account,
        transaction_type: TransactionType,
        amount: Money,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            account_id: account.id,
            account_number: account.account_number.clone(),
            account_name: account.account_name.clone(),
            source_number: account.account_number.clone(),
            beneficiary_number: account.account_number.clone(),
            transaction_type,
            amount,
            transaction_time: at,
        }
    }

    pub fn deposit(account: &Account, amount: Money, at: DateTime<Utc>) -> Self {
        Self::own(account, TransactionType::Credit, amount, at)
    }

    pub fn withdrawal(account: &Account, amount: Money, at: DateTime<Utc>) -> Self {
        Self::own(account, TransactionType::Debit, amount, at)
    }

    /// The two legs of a transfer, debit first. Both carry the same time.
    pub fn transfer(
        sender: &Account,
        receiver: &Account,
        amount: Money,
        at: DateTime<Utc>,
    ) -> (Self, Self) {
        let leg = |account: &Account, transaction_type| Self {
            account_id: account.id,
            account_number: account.account_number.clone(),
            account_name: account.account_name.clone(),
            source_number: sender.account_number.clone(),
            beneficiary_number: receiver.account_number.clone(),
            transaction_type,
            amount,
            transaction_time: at,
        };
        (
            leg(sender, TransactionType::Debit),
            leg(receiver, TransactionType::Credit),
        )
    }
}

/// Page request for history queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
}

impl Pagination {
    pub const DEFAULT_LIMIT: u32 = 10;
    /// Cap applied when the query spans all accounts.
    pub const MAX_UNFILTERED_LIMIT: u32 = 100;

    /// Pagination is requested when either value is positive; missing
    /// values fall back to page 1 and limit 10.
    pub fn requested(page: Option<u32>, limit: Option<u32>) -> Option<Self> {
        let page = page.unwrap_or(0);
        let limit = limit.unwrap_or(0);
        if page == 0 && limit == 0 {
            return None;
        }
        Some(Self {
            page: page.max(1),
            limit: if limit == 0 { Self::DEFAULT_LIMIT } else { limit },
        })
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }

    pub fn total_pages(&self, total_records: u64) -> u64 {
        total_records.div_ceil(u64::from(self.limit))
    }
}

/// Filter for transaction history. Dates are inclusive and compared against
/// the UTC calendar date of `transaction_time`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HistoryQuery {
    pub account_number: Option<AccountNumber>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub pagination: Option<Pagination>,
}

impl HistoryQuery {
    pub fn new(
        account_number: Option<AccountNumber>,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
        pagination: Option<Pagination>,
    ) -> DomainResult<Self> {
        if let (Some(start), Some(end)) = (start_date, end_date) {
            if start > end {
                return Err(DomainError::validation("start_date must not be after end_date"));
            }
        }
        let pagination = pagination.map(|mut p| {
            if account_number.is_none() {
                p.limit = p.limit.min(Pagination::MAX_UNFILTERED_LIMIT);
            }
            p
        });
        Ok(Self {
            account_number,
            start_date,
            end_date,
            pagination,
        })
    }

    pub fn matches(&self, entry: &LedgerEntry) -> bool {
        if let Some(number) = &self.account_number {
            if &entry.account_number != number {
                return false;
            }
        }
        let day = entry.transaction_time.date_naive();
        self.start_date.is_none_or(|start| day >= start)
            && self.end_date.is_none_or(|end| day <= end)
    }
}

/// One page of history, newest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryPage {
    pub entries: Vec<LedgerEntry>,
    pub total_records: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::AccountStatus;
    use crate::pin::PinHash;

    fn account(id: i64, number: &str) -> Account {
        let now = Utc::now();
        Account {
            id: AccountId::new(id).unwrap(),
            account_number: AccountNumber::parse(number).unwrap(),
            account_name: format!("holder {id}"),
            balance: Money::zero(),
            pin_hash: PinHash::from_stored("x"),
            status: AccountStatus::Active,
            failed_pin_attempts: 0,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    fn committed(new: NewLedgerEntry, id: i64) -> LedgerEntry {
        LedgerEntry {
            id: TransactionId::new(id).unwrap(),
            account_id: new.account_id,
            account_number: new.account_number,
            account_name: new.account_name,
            source_number: new.source_number,
            beneficiary_number: new.beneficiary_number,
            transaction_type: new.transaction_type,
            amount: new.amount,
            transaction_time: new.transaction_time,
            created_at: new.transaction_time,
        }
    }

    #[test]
    fn direction_parses_only_signs() {
        assert_eq!("+".parse::<Direction>().unwrap(), Direction::Increase);
        assert_eq!("-".parse::<Direction>().unwrap(), Direction::Decrease);
        for bad in ["", "*", "plus", "+-"] {
            assert!(matches!(bad.parse::<Direction>(), Err(DomainError::Validation(_))));
        }
    }

    #[test]
    fn own_account_entries_describe_cash_movements() {
        let a = account(1, "1111111111");
        let now = Utc::now();
        let dep = committed(NewLedgerEntry::deposit(&a, Money::from_major(10_000), now), 1);
        let wd = committed(NewLedgerEntry::withdrawal(&a, Money::from_major(10_000), now), 2);

        assert_eq!(dep.transaction_type, TransactionType::Credit);
        assert_eq!(dep.description(), "Cash deposit");
        assert_eq!(wd.transaction_type, TransactionType::Debit);
        assert_eq!(wd.description(), "Cash withdrawal");
        assert_eq!(wd.source_number, wd.beneficiary_number);
    }

    #[test]
    fn transfer_legs_share_time_and_counterparties() {
        let a = account(1, "1111111111");
        let b = account(2, "2222222222");
        let now = Utc::now();
        let (debit, credit) = NewLedgerEntry::transfer(&a, &b, Money::from_major(20_000), now);

        assert_eq!(debit.account_id, a.id);
        assert_eq!(credit.account_id, b.id);
        assert_eq!(debit.transaction_time, credit.transaction_time);
        assert_eq!(debit.amount, credit.amount);

        assert_eq!(committed(debit, 1).description(), "Transfer to 2222222222");
        assert_eq!(committed(credit, 2).description(), "Transfer from 1111111111");
    }

    #[test]
    fn pagination_defaults_and_cap() {
        assert_eq!(Pagination::requested(None, None), None);
        assert_eq!(
            Pagination::requested(Some(3), None),
            Some(Pagination { page: 3, limit: 10 })
        );
        assert_eq!(
            Pagination::requested(None, Some(25)),
            Some(Pagination { page: 1, limit: 25 })
        );

        let all = HistoryQuery::new(None, None, None, Pagination::requested(None, Some(500)))
            .unwrap();
        assert_eq!(all.pagination.unwrap().limit, 100);

        let one = HistoryQuery::new(
            Some(AccountNumber::parse("1111111111").unwrap()),
            None,
            None,
            Pagination::requested(None, Some(500)),
        )
        .unwrap();
        assert_eq!(one.pagination.unwrap().limit, 500);
    }

    #[test]
    fn pagination_math() {
        let p = Pagination { page: 3, limit: 10 };
        assert_eq!(p.offset(), 20);
        assert_eq!(p.total_pages(0), 0);
        assert_eq!(p.total_pages(21), 3);
        assert_eq!(p.total_pages(30), 3);
    }

    #[test]
    fn history_filter_is_inclusive_on_dates() {
        let a = account(1, "1111111111");
        let at = DateTime::parse_from_rfc3339("2025-03-10T23:59:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let entry = committed(NewLedgerEntry::deposit(&a, Money::from_major(10_000), at), 1);
        let day = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let next = NaiveDate::from_ymd_opt(2025, 3, 11).unwrap();

        let q = HistoryQuery::new(None, Some(day), Some(day), None).unwrap();
        assert!(q.matches(&entry));
        let q = HistoryQuery::new(None, Some(next), None, None).unwrap();
        assert!(!q.matches(&entry));
        let q = HistoryQuery::new(
            Some(AccountNumber::parse("2222222222").unwrap()),
            None,
            None,
            None,
        )
        .unwrap();
        assert!(!q.matches(&entry));

        assert!(HistoryQuery::new(None, Some(next), Some(day), None).is_err());
    }
}
