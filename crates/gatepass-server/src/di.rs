//! Component wiring.
//!
//! Every component is built once at startup and shared behind an `Arc` of its
//! trait object, so the service layer only ever sees the traits.

use deadpool_redis::{Config as RedisPoolConfig, Pool, PoolConfig, Runtime};
use gatepass_config::{AppConfig, RedisConfig};
use gatepass_core::{
    Clock, GatepassError, GatepassResult, ObjectStorage, SystemClock, TokenIssuer,
};
use gatepass_repository::{DatabasePoolInterface, PgUserRepository, UserRepository};
use gatepass_security::TokenProvider;
use gatepass_service::{CacheInterface, RedisCacheService, ServiceSettings, UserService, UserServiceImpl};
use gatepass_storage::S3Storage;
use std::sync::Arc;
use tracing::info;

/// Creates the Redis pool, or `None` when caching is disabled.
///
/// No connection is opened here; an unreachable Redis only degrades reads
/// to the database.
pub fn create_redis_pool(config: &RedisConfig) -> GatepassResult<Option<Arc<Pool>>> {
    if !config.enabled {
        info!("Redis cache disabled");
        return Ok(None);
    }

    let mut redis_cfg = RedisPoolConfig::from_url(&config.url);
    redis_cfg.pool = Some(PoolConfig::new(config.pool_size as usize));

    let pool = redis_cfg
        .create_pool(Some(Runtime::Tokio1))
        .map_err(|e| GatepassError::Cache(format!("Failed to create Redis pool: {e}")))?;

    info!("Redis cache pool created (size: {})", config.pool_size);
    Ok(Some(Arc::new(pool)))
}

/// Builds the cache component from an optional pool.
#[must_use]
pub fn create_cache(pool: Option<Arc<Pool>>) -> Arc<dyn CacheInterface> {
    match pool {
        Some(pool) => Arc::new(RedisCacheService::new(pool)),
        None => Arc::new(RedisCacheService::disabled()),
    }
}

/// Assembles the user service from its collaborators.
pub fn build_user_service(
    config: &AppConfig,
    user_repository: Arc<dyn UserRepository>,
    cache: Arc<dyn CacheInterface>,
    storage: Arc<dyn ObjectStorage>,
    token_issuer: Arc<dyn TokenIssuer>,
    clock: Arc<dyn Clock>,
) -> GatepassResult<Arc<dyn UserService>> {
    let settings = ServiceSettings::from_config(config)?;
    Ok(Arc::new(UserServiceImpl::new(
        user_repository,
        cache,
        storage,
        token_issuer,
        clock,
        settings,
    )))
}

/// Application components resolved at startup.
pub struct AppContainer {
    user_service: Arc<dyn UserService>,
}

impl AppContainer {
    /// Wires the production components.
    pub async fn build(
        config: &AppConfig,
        db_pool: Arc<dyn DatabasePoolInterface>,
    ) -> GatepassResult<Self> {
        let user_repository: Arc<dyn UserRepository> = Arc::new(PgUserRepository::new(db_pool));
        let cache = create_cache(create_redis_pool(&config.redis)?);
        let storage: Arc<dyn ObjectStorage> = Arc::new(S3Storage::new(&config.storage).await);
        let token_issuer: Arc<dyn TokenIssuer> =
            Arc::new(TokenProvider::new(Arc::new(config.security.clone())));

        let user_service = build_user_service(
            config,
            user_repository,
            cache,
            storage,
            token_issuer,
            Arc::new(SystemClock),
        )?;

        info!("Application components wired");
        Ok(Self { user_service })
    }

    /// Returns the user service.
    #[must_use]
    pub fn user_service(&self) -> Arc<dyn UserService> {
        self.user_service.clone()
    }
}
