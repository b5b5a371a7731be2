use std::sync::Arc;

use thiserror::Error;

use pinledger_infra::LedgerService;
use pinledger_infra::config::AppConfig;
use pinledger_infra::reset_token::{InMemoryResetTokenStore, ResetTokenError, ResetTokenStore};
use pinledger_infra::store::{InMemoryStore, Store, StoreError};

#[cfg(feature = "persistent")]
use pinledger_infra::{db, reset_token::RedisResetTokenStore, store::PostgresStore};

/// Ledger service over runtime-selected backends.
pub type Ledger = LedgerService<dyn Store, dyn ResetTokenStore>;

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    ResetTokens(#[from] ResetTokenError),
}

#[derive(Clone)]
pub enum AppServices {
    InMemory {
        ledger: Arc<Ledger>,
    },
    #[cfg(feature = "persistent")]
    Persistent {
        ledger: Arc<Ledger>,
        store: Arc<PostgresStore>,
    },
}

impl AppServices {
    pub fn ledger(&self) -> &Ledger {
        match self {
            AppServices::InMemory { ledger } => ledger,
            #[cfg(feature = "persistent")]
            AppServices::Persistent { ledger, .. } => ledger,
        }
    }

    /// Release pooled connections. No-op for in-memory stores.
    pub async fn close(&self) {
        match self {
            AppServices::InMemory { .. } => {}
            #[cfg(feature = "persistent")]
            AppServices::Persistent { store, .. } => store.close().await,
        }
    }
}

pub async fn build_services(config: &AppConfig) -> Result<AppServices, BootstrapError> {
    if config.use_persistent_stores {
        #[cfg(feature = "persistent")]
        {
            return build_persistent_services(config).await;
        }
        #[cfg(not(feature = "persistent"))]
        {
            tracing::warn!(
                "USE_PERSISTENT_STORES=true but the persistent feature is not enabled, falling back to in-memory"
            );
            return Ok(build_in_memory_services());
        }
    }

    Ok(build_in_memory_services())
}

/// In-memory wiring (dev/test).
pub fn build_in_memory_services() -> AppServices {
    let store: Arc<dyn Store> = Arc::new(InMemoryStore::new());
    let tokens: Arc<dyn ResetTokenStore> = Arc::new(InMemoryResetTokenStore::new());
    tracing::info!("using in-memory account store and reset-token store");

    AppServices::InMemory {
        ledger: Arc::new(LedgerService::new(store, tokens)),
    }
}

#[cfg(feature = "persistent")]
async fn build_persistent_services(config: &AppConfig) -> Result<AppServices, BootstrapError> {
    let pool = db::connect(&config.database).await?;
    db::migrate(&pool).await?;
    let postgres = Arc::new(PostgresStore::new(pool));

    let redis = RedisResetTokenStore::new(&config.redis_url).await?;
    tracing::info!("using postgres account store and redis reset-token store");

    let store: Arc<dyn Store> = postgres.clone();
    let tokens: Arc<dyn ResetTokenStore> = Arc::new(redis);

    Ok(AppServices::Persistent {
        ledger: Arc::new(LedgerService::new(store, tokens)),
        store: postgres,
    })
}
