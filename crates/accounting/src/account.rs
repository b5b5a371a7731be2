use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use pinledger_core::{AccountId, AccountNumber, DomainError, DomainResult, Entity, Money};

use crate::pin::PinHash;

/// Lockout state of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccountStatus {
    #[serde(rename = "ACTIVE")]
    Active,
    #[serde(rename = "BLOCKED_PIN")]
    BlockedPin,
}

impl AccountStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AccountStatus::Active => "ACTIVE",
            AccountStatus::BlockedPin => "BLOCKED_PIN",
        }
    }
}

impl core::fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for AccountStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(AccountStatus::Active),
            "BLOCKED_PIN" => Ok(AccountStatus::BlockedPin),
            other => Err(DomainError::system(format!("unknown account status '{other}'"))),
        }
    }
}

/// A money-bearing account as persisted.
///
/// Not `Serialize`: the PIN hash must never leave the process. Transports
/// build their own views.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: AccountId,
    pub account_number: AccountNumber,
    pub account_name: String,
    pub balance: Money,
    pub pin_hash: PinHash,
    pub status: AccountStatus,
    pub failed_pin_attempts: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Account {
    pub fn is_blocked(&self) -> bool {
        self.status == AccountStatus::BlockedPin
    }
}

impl Entity for Account {
    type Id = AccountId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Insert payload for a new account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccount {
    pub account_number: AccountNumber,
    pub account_name: String,
    pub balance: Money,
    pub pin_hash: PinHash,
}

impl NewAccount {
    pub fn new(
        account_number: AccountNumber,
        account_name: String,
        initial_deposit: Money,
        pin_hash: PinHash,
    ) -> DomainResult<Self> {
        if initial_deposit.is_negative() {
            return Err(DomainError::validation("initial_deposit must not be negative"));
        }
        Ok(Self {
            account_number,
            account_name,
            balance: initial_deposit,
            pin_hash,
        })
    }
}

/// Trim and bound-check a display name (3 to 255 characters).
pub fn validate_account_name(raw: &str) -> DomainResult<String> {
    let name = raw.trim();
    let len = name.chars().count();
    if len < 3 {
        return Err(DomainError::validation("account_name must be at least 3 characters"));
    }
    if len > 255 {
        return Err(DomainError::validation("account_name must be at most 255 characters"));
    }
    Ok(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn number() -> AccountNumber {
        AccountNumber::parse("1234567890").unwrap()
    }

    #[test]
    fn negative_initial_deposit_is_rejected() {
        let err = NewAccount::new(
            number(),
            "Alice".into(),
            Money::from_major(-1),
            PinHash::from_stored("x"),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn zero_initial_deposit_is_allowed() {
        let acc =
            NewAccount::new(number(), "Alice".into(), Money::zero(), PinHash::from_stored("x"))
                .unwrap();
        assert!(acc.balance.is_zero());
    }

    #[test]
    fn account_name_bounds() {
        assert!(validate_account_name("ab").is_err());
        assert!(validate_account_name("  ab  ").is_err());
        assert_eq!(validate_account_name("  Bob ").unwrap(), "Bob");
        assert!(validate_account_name(&"x".repeat(255)).is_ok());
        assert!(validate_account_name(&"x".repeat(256)).is_err());
    }

    #[test]
    fn status_round_trips_through_its_column_text() {
        for status in [AccountStatus::Active, AccountStatus::BlockedPin] {
            assert_eq!(status.as_str().parse::<AccountStatus>().unwrap(), status);
        }
        assert!("LOCKED".parse::<AccountStatus>().is_err());
    }
}
