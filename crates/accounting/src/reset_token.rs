//! Single-use PIN reset tokens.

use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::{RngCore, rngs::OsRng};
use serde::{Deserialize, Serialize};

use pinledger_core::{AccountNumber, DomainError, DomainResult};

/// Lifetime of a reset token.
pub const RESET_TOKEN_TTL: Duration = Duration::from_secs(5 * 60);

const TOKEN_BYTES: usize = 32;

/// 256 bits from the OS RNG, hex-encoded.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResetToken(String);

impl ResetToken {
    pub fn generate() -> Self {
        let mut bytes = [0u8; TOKEN_BYTES];
        OsRng.fill_bytes(&mut bytes);
        Self(hex::encode(bytes))
    }

    /// Accepts any non-blank caller-supplied token; whether it is live is
    /// decided by the token store.
    pub fn parse(raw: impl AsRef<str>) -> DomainResult<Self> {
        let raw = raw.as_ref().trim();
        if raw.is_empty() {
            return Err(DomainError::validation("reset_token is required"));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Debug for ResetToken {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        // enough to correlate log lines, not enough to replay
        let head = self.0.get(..8).unwrap_or_default();
        write!(f, "ResetToken({head}…)")
    }
}

/// Issued by Forgot PIN.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetGrant {
    pub account_number: AccountNumber,
    pub reset_token: ResetToken,
    pub expires_at: DateTime<Utc>,
}

impl ResetGrant {
    pub fn issue(
        account_number: AccountNumber,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> DomainResult<Self> {
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| DomainError::system(e.to_string()))?;
        Ok(Self {
            account_number,
            reset_token: ResetToken::generate(),
            expires_at: now + ttl,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_tokens_are_64_hex_chars_and_distinct() {
        let a = ResetToken::generate();
        let b = ResetToken::generate();
        assert_eq!(a.as_str().len(), 64);
        assert!(a.as_str().bytes().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn blank_token_is_a_validation_error() {
        assert!(matches!(ResetToken::parse("  "), Err(DomainError::Validation(_))));
    }

    #[test]
    fn grant_expires_five_minutes_after_issue() {
        let now = Utc::now();
        let grant =
            ResetGrant::issue(AccountNumber::parse("1234567890").unwrap(), now, RESET_TOKEN_TTL)
                .unwrap();
        assert_eq!(grant.expires_at - now, chrono::Duration::minutes(5));
    }

    #[test]
    fn debug_does_not_print_the_whole_token() {
        let t = ResetToken::generate();
        assert!(!format!("{t:?}").contains(t.as_str()));
    }
}
