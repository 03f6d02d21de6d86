//! Redis cache for the boxoffice booking service.
//!
//! [`RedisCache`] implements [`CacheStore`] with `GET`, `SET ... EX` and `DEL`
//! through a [`ConnectionManager`], which reconnects on its own after the
//! server goes away. A command issued while Redis is down fails with
//! [`CacheError`] instead of blocking, so callers can fall back to the store.
//!
//! # Example
//!
//! ```no_run
//! use boxoffice_core::cache::CacheStore;
//! use boxoffice_redis::RedisCache;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let cache = RedisCache::connect("redis://127.0.0.1:6379").await?;
//! cache.set_ex("event:42", "{}".to_string(), Duration::from_secs(60)).await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use boxoffice_core::cache::{CacheError, CacheFuture, CacheStore};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, RedisError};
use std::time::Duration;

/// Redis-backed [`CacheStore`].
///
/// Cloning shares the connection manager.
#[derive(Clone)]
pub struct RedisCache {
    conn_manager: ConnectionManager,
}

impl RedisCache {
    /// Connect to Redis.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::ConnectionFailed`] if the URL is invalid or the
    /// first connection cannot be established.
    pub async fn connect(redis_url: &str) -> Result<Self, CacheError> {
        let client = Client::open(redis_url)
            .map_err(|e| CacheError::ConnectionFailed(format!("Failed to create Redis client: {e}")))?;

        let conn_manager = ConnectionManager::new(client).await.map_err(|e| {
            CacheError::ConnectionFailed(format!("Failed to create Redis connection manager: {e}"))
        })?;

        tracing::info!("Redis cache connected");
        Ok(Self { conn_manager })
    }

    /// Round-trip a `PING`.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] if Redis does not answer.
    pub async fn ping(&self) -> Result<(), CacheError> {
        let mut conn = self.conn_manager.clone();
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(command_error)?;
        Ok(())
    }
}

fn command_error(err: RedisError) -> CacheError {
    if err.is_io_error() || err.is_connection_dropped() || err.is_connection_refusal() {
        CacheError::ConnectionFailed(err.to_string())
    } else {
        CacheError::CommandFailed(err.to_string())
    }
}

/// `EX` takes whole seconds and rejects zero.
fn ttl_seconds(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

impl CacheStore for RedisCache {
    fn get(&self, key: &str) -> CacheFuture<'_, Option<String>> {
        let key = key.to_string();
        Box::pin(async move {
            let mut conn = self.conn_manager.clone();
            let value: Option<String> = conn.get(&key).await.map_err(command_error)?;
            tracing::trace!(key = %key, hit = value.is_some(), "Cache read");
            Ok(value)
        })
    }

    fn set_ex(&self, key: &str, value: String, ttl: Duration) -> CacheFuture<'_, ()> {
        let key = key.to_string();
        Box::pin(async move {
            let mut conn = self.conn_manager.clone();
            let ttl_seconds = ttl_seconds(ttl);
            let _: () = conn
                .set_ex(&key, value, ttl_seconds)
                .await
                .map_err(command_error)?;
            tracing::trace!(key = %key, ttl_seconds, "Cache write");
            Ok(())
        })
    }

    fn delete(&self, key: &str) -> CacheFuture<'_, bool> {
        let key = key.to_string();
        Box::pin(async move {
            let mut conn = self.conn_manager.clone();
            let removed: u64 = conn.del(&key).await.map_err(command_error)?;
            tracing::debug!(key = %key, removed, "Cache entry deleted");
            Ok(removed > 0)
        })
    }
}
