//! Short-lived reset-token storage.
//!
//! Tokens map to the account number they were issued for and disappear
//! after their TTL. Consumption is get-then-delete and not atomic: two
//! concurrent resets with the same token can both succeed. The TTL bounds
//! the window.

pub mod in_memory;
#[cfg(feature = "redis")]
pub mod redis_store;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use pinledger_accounting::ResetToken;
use pinledger_core::{AccountNumber, DomainError};

pub use in_memory::InMemoryResetTokenStore;
#[cfg(feature = "redis")]
pub use redis_store::RedisResetTokenStore;

#[derive(Debug, Error)]
pub enum ResetTokenError {
    #[error("reset token store unavailable: {0}")]
    Unavailable(String),

    /// A stored value that is not an account number.
    #[error("corrupt reset token value: {0}")]
    Corrupt(String),
}

impl From<ResetTokenError> for DomainError {
    fn from(value: ResetTokenError) -> Self {
        DomainError::system(value.to_string())
    }
}

#[async_trait]
pub trait ResetTokenStore: Send + Sync {
    async fn put(
        &self,
        token: &ResetToken,
        account_number: &AccountNumber,
        ttl: Duration,
    ) -> Result<(), ResetTokenError>;

    /// `None` when the token is unknown or expired.
    async fn get(&self, token: &ResetToken) -> Result<Option<AccountNumber>, ResetTokenError>;

    async fn delete(&self, token: &ResetToken) -> Result<(), ResetTokenError>;
}

/// Key under which a token is stored.
pub fn token_key(token: &ResetToken) -> String {
    format!("reset_token:{}", token.as_str())
}
