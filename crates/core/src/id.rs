//! Strongly-typed identifiers used across the domain.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Surrogate key of an account row.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(i64);

/// Surrogate key of a ledger entry row.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(i64);

macro_rules! impl_serial_newtype {
    ($t:ty, $name:literal) => {
        impl $t {
            /// Wrap a raw key. Keys are assigned by the store and are always >= 1.
            pub fn new(raw: i64) -> Result<Self, DomainError> {
                if raw < 1 {
                    return Err(DomainError::validation(format!("{} must be >= 1", $name)));
                }
                Ok(Self(raw))
            }

            pub fn get(self) -> i64 {
                self.0
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<$t> for i64 {
            fn from(value: $t) -> Self {
                value.0
            }
        }

        impl FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let raw = s
                    .parse::<i64>()
                    .map_err(|e| DomainError::validation(format!("{}: {}", $name, e)))?;
                Self::new(raw)
            }
        }
    };
}

impl_serial_newtype!(AccountId, "AccountId");
impl_serial_newtype!(TransactionId, "TransactionId");

/// Externally visible account identifier: a numeric string.
///
/// Generated numbers are always [`AccountNumber::LEN`] digits wide; lookups
/// accept any non-empty digit string so that malformed numbers fail as
/// "not found" rather than leaking which formats exist.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccountNumber(String);

impl AccountNumber {
    /// Width of generated account numbers.
    pub const LEN: usize = 10;

    pub fn parse(raw: impl AsRef<str>) -> Result<Self, DomainError> {
        let raw = raw.as_ref().trim();
        if raw.is_empty() {
            return Err(DomainError::validation("account_number is required"));
        }
        if !raw.bytes().all(|b| b.is_ascii_digit()) {
            return Err(DomainError::validation("account_number must be numeric"));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for AccountNumber {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for AccountNumber {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<AccountNumber> for String {
    fn from(value: AccountNumber) -> Self {
        value.0
    }
}

impl FromStr for AccountNumber {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serial_ids_reject_non_positive() {
        assert!(AccountId::new(0).is_err());
        assert!(TransactionId::new(-4).is_err());
        assert_eq!(AccountId::new(7).unwrap().get(), 7);
        assert_eq!("12".parse::<TransactionId>().unwrap().get(), 12);
    }

    #[test]
    fn account_number_must_be_digits() {
        assert!(AccountNumber::parse("").is_err());
        assert!(AccountNumber::parse("12a4").is_err());
        assert_eq!(AccountNumber::parse(" 0012345678 ").unwrap().as_str(), "0012345678");
    }

    #[test]
    fn account_number_deserializes_with_validation() {
        let ok: AccountNumber = serde_json::from_str("\"1234567890\"").unwrap();
        assert_eq!(ok.as_str(), "1234567890");
        assert!(serde_json::from_str::<AccountNumber>("\"abc\"").is_err());
    }
}
