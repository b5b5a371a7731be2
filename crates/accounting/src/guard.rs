//! PIN lockout state machine.
//!
//! ```text
//! ACTIVE --(mismatch, attempts < 3)--> ACTIVE (attempts + 1)
//! ACTIVE --(mismatch, attempts = 3)--> BLOCKED_PIN
//! ACTIVE --(match)-------------------> ACTIVE (attempts = 0)
//! BLOCKED_PIN --(any PIN check)------> BLOCKED_PIN, refused
//! any --(PIN change / reset)---------> ACTIVE (attempts = 0)
//! ```
//!
//! The guard is pure: it decides, the store records. The increment that
//! moves an account to BLOCKED_PIN happens in a single store statement so a
//! concurrent check cannot observe a count of 3 on an ACTIVE row.

use pinledger_core::DomainError;

use crate::account::{Account, AccountStatus};
use crate::pin::Pin;

/// Consecutive failures that block an account.
pub const MAX_PIN_ATTEMPTS: u32 = 3;

/// Outcome of checking a PIN against an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinVerdict {
    /// PIN matched. `reset_counter` is set when earlier failures must be cleared.
    Accepted { reset_counter: bool },
    /// PIN did not match; the caller records the failure.
    Rejected,
    /// Account is already blocked; nothing was checked.
    Blocked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinGuard {
    blocked_message: &'static str,
}

impl PinGuard {
    /// Guard for balance inquiries and money movement.
    pub const STANDARD: PinGuard = PinGuard {
        blocked_message: "Account is blocked. Please reset your PIN",
    };

    /// Guard for PIN change, which points the caller at the recovery flow.
    pub const PIN_CHANGE: PinGuard = PinGuard {
        blocked_message: "Account is blocked. Please use Forgot PIN",
    };

    pub fn check(&self, account: &Account, pin: &Pin) -> PinVerdict {
        if account.is_blocked() {
            return PinVerdict::Blocked;
        }
        if account.pin_hash.verify(pin) {
            PinVerdict::Accepted {
                reset_counter: account.failed_pin_attempts > 0,
            }
        } else {
            PinVerdict::Rejected
        }
    }

    pub fn blocked_error(&self) -> DomainError {
        DomainError::forbidden(self.blocked_message)
    }

    /// Error for a recorded failure, given the counter after the increment.
    ///
    /// The failure that reaches the limit is reported as the lockout itself.
    pub fn failure_error(failed_attempts: u32) -> DomainError {
        match remaining_attempts(failed_attempts) {
            0 => DomainError::forbidden("Account blocked due to multiple failed PIN attempts"),
            remaining_attempts => DomainError::Unauthorized { remaining_attempts },
        }
    }
}

pub fn remaining_attempts(failed_attempts: u32) -> u32 {
    MAX_PIN_ATTEMPTS.saturating_sub(failed_attempts)
}

/// Status a row takes after its failure counter reaches `failed_attempts`.
pub fn status_after_failures(failed_attempts: u32) -> AccountStatus {
    if failed_attempts >= MAX_PIN_ATTEMPTS {
        AccountStatus::BlockedPin
    } else {
        AccountStatus::Active
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pinledger_core::{AccountId, AccountNumber, Money};

    fn account(pin: &Pin, status: AccountStatus, failed: u32) -> Account {
        let now = Utc::now();
        Account {
            id: AccountId::new(1).unwrap(),
            account_number: AccountNumber::parse("1234567890").unwrap(),
            account_name: "Alice".into(),
            balance: Money::from_major(50_000),
            pin_hash: pin.hash().unwrap(),
            status,
            failed_pin_attempts: failed,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    #[test]
    fn blocked_account_is_refused_even_with_correct_pin() {
        let pin = Pin::parse("123456").unwrap();
        let acc = account(&pin, AccountStatus::BlockedPin, 3);
        assert_eq!(PinGuard::STANDARD.check(&acc, &pin), PinVerdict::Blocked);
    }

    #[test]
    fn match_clears_counter_only_when_needed() {
        let pin = Pin::parse("123456").unwrap();
        assert_eq!(
            PinGuard::STANDARD.check(&account(&pin, AccountStatus::Active, 0), &pin),
            PinVerdict::Accepted { reset_counter: false }
        );
        assert_eq!(
            PinGuard::STANDARD.check(&account(&pin, AccountStatus::Active, 2), &pin),
            PinVerdict::Accepted { reset_counter: true }
        );
    }

    #[test]
    fn mismatch_is_rejected() {
        let pin = Pin::parse("123456").unwrap();
        let wrong = Pin::parse("000000").unwrap();
        let acc = account(&pin, AccountStatus::Active, 0);
        assert_eq!(PinGuard::STANDARD.check(&acc, &wrong), PinVerdict::Rejected);
    }

    #[test]
    fn failures_count_down_then_block() {
        assert_eq!(
            PinGuard::failure_error(1),
            DomainError::Unauthorized { remaining_attempts: 2 }
        );
        assert_eq!(
            PinGuard::failure_error(2),
            DomainError::Unauthorized { remaining_attempts: 1 }
        );
        assert!(matches!(PinGuard::failure_error(3), DomainError::Forbidden(_)));

        assert_eq!(status_after_failures(2), AccountStatus::Active);
        assert_eq!(status_after_failures(3), AccountStatus::BlockedPin);
    }

    #[test]
    fn blocked_messages_differ_by_operation() {
        assert_ne!(
            PinGuard::STANDARD.blocked_error(),
            PinGuard::PIN_CHANGE.blocked_error()
        );
    }
}
