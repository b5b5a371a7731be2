use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;

use pinledger_accounting::ResetToken;
use pinledger_core::AccountNumber;

use super::{ResetTokenError, ResetTokenStore, token_key};

/// Redis-backed token store. Expiry is Redis `SETEX`.
///
/// Clones share one `ConnectionManager`, which reconnects on failure.
#[derive(Clone)]
pub struct RedisResetTokenStore {
    conn: ConnectionManager,
}

impl RedisResetTokenStore {
    pub async fn new(redis_url: &str) -> Result<Self, ResetTokenError> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| ResetTokenError::Unavailable(format!("invalid redis url: {e}")))?;
        let conn = ConnectionManager::new(client).await.map_err(|e| {
            ResetTokenError::Unavailable(format!("failed to connect to redis: {e}"))
        })?;
        tracing::info!("redis reset token store connected");
        Ok(Self { conn })
    }
}

#[async_trait]
impl ResetTokenStore for RedisResetTokenStore {
    async fn put(
        &self,
        token: &ResetToken,
        account_number: &AccountNumber,
        ttl: Duration,
    ) -> Result<(), ResetTokenError> {
        let mut conn = self.conn.clone();
        let ttl_seconds = ttl.as_secs().max(1);
        let _: () = conn
            .set_ex(token_key(token), account_number.as_str(), ttl_seconds)
            .await
            .map_err(|e| ResetTokenError::Unavailable(format!("failed to store token: {e}")))?;

        tracing::info!(
            account_number = %account_number,
            ttl_seconds,
            "stored reset token"
        );
        Ok(())
    }

    async fn get(&self, token: &ResetToken) -> Result<Option<AccountNumber>, ResetTokenError> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn
            .get(token_key(token))
            .await
            .map_err(|e| ResetTokenError::Unavailable(format!("failed to read token: {e}")))?;
        value
            .map(|raw| AccountNumber::parse(raw).map_err(|e| ResetTokenError::Corrupt(e.to_string())))
            .transpose()
    }

    async fn delete(&self, token: &ResetToken) -> Result<(), ResetTokenError> {
        let mut conn = self.conn.clone();
        let _: () = conn
            .del(token_key(token))
            .await
            .map_err(|e| ResetTokenError::Unavailable(format!("failed to delete token: {e}")))?;
        Ok(())
    }
}
