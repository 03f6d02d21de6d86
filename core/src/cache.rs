//! Key-value cache with per-entry TTL.
//!
//! Only the event reader uses the cache. Values are opaque strings (the reader
//! stores JSON), keys follow `event:{id}`.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use thiserror::Error;

/// Boxed future returned by cache operations.
pub type CacheFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, CacheError>> + Send + 'a>>;

/// Errors raised by cache adapters.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Could not reach the cache.
    #[error("Cache connection failed: {0}")]
    ConnectionFailed(String),

    /// The command was rejected or failed.
    #[error("Cache command failed: {0}")]
    CommandFailed(String),
}

/// Cache key for an event payload.
#[must_use]
pub fn event_key(event_id: impl std::fmt::Display) -> String {
    format!("event:{event_id}")
}

/// TTL key-value cache.
pub trait CacheStore: Send + Sync {
    /// Read a value. Expired entries read as `None`.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] if the cache cannot be queried.
    fn get(&self, key: &str) -> CacheFuture<'_, Option<String>>;

    /// Write a value that expires after `ttl`.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] if the write fails.
    fn set_ex(&self, key: &str, value: String, ttl: Duration) -> CacheFuture<'_, ()>;

    /// Remove a value. Returns whether an entry existed.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] if the delete fails.
    fn delete(&self, key: &str) -> CacheFuture<'_, bool>;
}
