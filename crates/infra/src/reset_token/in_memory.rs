use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use pinledger_accounting::ResetToken;
use pinledger_core::AccountNumber;

use super::{ResetTokenError, ResetTokenStore, token_key};

/// In-memory token store with lazy expiry.
///
/// Intended for tests/dev. Expired tokens are never returned, but they are
/// only purged when `get` hits them or when the next `put` sweeps the map, so
/// stale entries linger until the next Forgot-PIN. There is no background
/// reaper.
#[derive(Debug, Default)]
pub struct InMemoryResetTokenStore {
    tokens: Mutex<HashMap<String, (AccountNumber, DateTime<Utc>)>>,
}

impl InMemoryResetTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<String, (AccountNumber, DateTime<Utc>)>>, ResetTokenError>
    {
        self.tokens
            .lock()
            .map_err(|_| ResetTokenError::Unavailable("token map poisoned".to_string()))
    }
}

#[async_trait]
impl ResetTokenStore for InMemoryResetTokenStore {
    async fn put(
        &self,
        token: &ResetToken,
        account_number: &AccountNumber,
        ttl: Duration,
    ) -> Result<(), ResetTokenError> {
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| ResetTokenError::Unavailable(format!("invalid ttl: {e}")))?;
        let mut tokens = self.lock()?;
        let now = Utc::now();
        tokens.retain(|_, (_, expires_at)| *expires_at > now);
        tokens.insert(token_key(token), (account_number.clone(), now + ttl));
        Ok(())
    }

    async fn get(&self, token: &ResetToken) -> Result<Option<AccountNumber>, ResetTokenError> {
        let mut tokens = self.lock()?;
        let key = token_key(token);
        match tokens.get(&key) {
            Some((number, expires_at)) if *expires_at > Utc::now() => Ok(Some(number.clone())),
            Some(_) => {
                tokens.remove(&key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn delete(&self, token: &ResetToken) -> Result<(), ResetTokenError> {
        self.lock()?.remove(&token_key(token));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn number() -> AccountNumber {
        AccountNumber::parse("1234567890").unwrap()
    }

    #[tokio::test]
    async fn live_token_resolves_until_deleted() {
        let store = InMemoryResetTokenStore::new();
        let token = ResetToken::generate();
        store.put(&token, &number(), Duration::from_secs(300)).await.unwrap();

        assert_eq!(store.get(&token).await.unwrap(), Some(number()));
        store.delete(&token).await.unwrap();
        assert_eq!(store.get(&token).await.unwrap(), None);
    }

    #[tokio::test]
    async fn expired_token_is_gone() {
        let store = InMemoryResetTokenStore::new();
        let token = ResetToken::generate();
        store.put(&token, &number(), Duration::ZERO).await.unwrap();
        assert_eq!(store.get(&token).await.unwrap(), None);
    }

    #[tokio::test]
    async fn put_sweeps_expired_tokens() {
        let store = InMemoryResetTokenStore::new();
        let stale = ResetToken::generate();
        store.put(&stale, &number(), Duration::ZERO).await.unwrap();
        assert_eq!(store.tokens.lock().unwrap().len(), 1);

        let fresh = ResetToken::generate();
        store.put(&fresh, &number(), Duration::from_secs(300)).await.unwrap();
        let tokens = store.tokens.lock().unwrap();
        assert_eq!(tokens.len(), 1);
        assert!(tokens.contains_key(&token_key(&fresh)));
    }

    #[tokio::test]
    async fn unknown_token_is_none() {
        let store = InMemoryResetTokenStore::new();
        assert_eq!(store.get(&ResetToken::generate()).await.unwrap(), None);
    }
}
