//! Infrastructure handles created once at startup.
//!
//! ```rust,ignore
//! let config = Config::from_env();
//! let resources = Resources::from_config(&config).await?;
//! ```

use crate::config::Config;
use boxoffice_core::environment::SystemClock;
use boxoffice_postgres::PgStore;
use boxoffice_redis::RedisCache;
use boxoffice_redpanda::RedpandaEventBus;
use std::sync::Arc;
use tracing::info;

/// Store, bus, cache and clock shared by the HTTP layer and the consumer.
#[derive(Clone)]
pub struct Resources {
    /// `PostgreSQL` store (migrated)
    pub store: PgStore,
    /// Redpanda event bus
    pub event_bus: Arc<RedpandaEventBus>,
    /// Redis event cache
    pub cache: Arc<RedisCache>,
    /// Wall clock for booking timestamps
    pub clock: Arc<SystemClock>,
}

impl Resources {
    /// Connect to every backing service and run migrations.
    ///
    /// # Errors
    ///
    /// Returns error if the database is unreachable, a migration fails, the
    /// event bus cannot be configured or Redis refuses the connection.
    pub async fn from_config(config: &Config) -> Result<Self, Box<dyn std::error::Error>> {
        info!("Connecting to PostgreSQL...");
        let store = PgStore::connect(&config.postgres.url, &config.postgres.store_options()).await?;
        store.migrate().await?;
        info!("PostgreSQL connected, migrations applied");

        info!(brokers = %config.redpanda.brokers, "Configuring Redpanda event bus...");
        let event_bus = RedpandaEventBus::builder()
            .brokers(config.redpanda.brokers.clone())
            .consumer_group(config.redpanda.consumer_group.clone())
            .auto_offset_reset(config.redpanda.auto_offset_reset.clone())
            .build()?;

        info!("Connecting to Redis...");
        let cache = RedisCache::connect(&config.redis.url).await?;
        cache.ping().await?;
        info!("Redis connected");

        Ok(Self {
            store,
            event_bus: Arc::new(event_bus),
            cache: Arc::new(cache),
            clock: Arc::new(SystemClock),
        })
    }

    /// Release pooled connections. Call after background tasks have stopped.
    pub async fn close(&self) {
        self.store.close().await;
        info!("PostgreSQL pool closed");
    }
}
