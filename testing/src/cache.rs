//! In-memory TTL cache.
//!
//! Expiry uses `tokio::time::Instant`, so tests running with paused time can
//! `tokio::time::advance` past a TTL instead of sleeping.

use boxoffice_core::cache::{CacheError, CacheFuture, CacheStore};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

#[derive(Default)]
struct Inner {
    entries: Mutex<HashMap<String, (String, Instant)>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    fail_deletes: AtomicBool,
}

impl Inner {
    fn entries(&self) -> MutexGuard<'_, HashMap<String, (String, Instant)>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn unreachable_cache() -> CacheError {
    CacheError::ConnectionFailed("cache unreachable".to_string())
}

/// In-memory [`CacheStore`] for tests.
#[derive(Clone, Default)]
pub struct InMemoryCache {
    inner: Arc<Inner>,
}

impl InMemoryCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a live (unexpired) entry exists for `key`.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.inner
            .entries()
            .get(key)
            .is_some_and(|(_, expires_at)| *expires_at > Instant::now())
    }

    /// Make `get` fail until switched back.
    pub fn set_fail_reads(&self, fail: bool) {
        self.inner.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make `set_ex` fail until switched back.
    pub fn set_fail_writes(&self, fail: bool) {
        self.inner.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make `delete` fail until switched back.
    pub fn set_fail_deletes(&self, fail: bool) {
        self.inner.fail_deletes.store(fail, Ordering::SeqCst);
    }
}

impl CacheStore for InMemoryCache {
    fn get(&self, key: &str) -> CacheFuture<'_, Option<String>> {
        let key = key.to_string();
        Box::pin(async move {
            if self.inner.fail_reads.load(Ordering::SeqCst) {
                return Err(unreachable_cache());
            }
            let mut entries = self.inner.entries();
            match entries.get(&key) {
                Some((value, expires_at)) if *expires_at > Instant::now() => Ok(Some(value.clone())),
                Some(_) => {
                    entries.remove(&key);
                    Ok(None)
                }
                None => Ok(None),
            }
        })
    }

    fn set_ex(&self, key: &str, value: String, ttl: Duration) -> CacheFuture<'_, ()> {
        let key = key.to_string();
        Box::pin(async move {
            if self.inner.fail_writes.load(Ordering::SeqCst) {
                return Err(unreachable_cache());
            }
            self.inner
                .entries()
                .insert(key, (value, Instant::now() + ttl));
            Ok(())
        })
    }

    fn delete(&self, key: &str) -> CacheFuture<'_, bool> {
        let key = key.to_string();
        Box::pin(async move {
            if self.inner.fail_deletes.load(Ordering::SeqCst) {
                return Err(unreachable_cache());
            }
            Ok(self.inner.entries().remove(&key).is_some())
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn entries_expire_after_ttl() {
        let cache = InMemoryCache::new();
        cache
            .set_ex("event:1", "{}".to_string(), Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(cache.get("event:1").await.unwrap().as_deref(), Some("{}"));

        tokio::time::advance(Duration::from_secs(61)).await;
        assert_eq!(cache.get("event:1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn delete_reports_presence() {
        let cache = InMemoryCache::new();
        assert!(!cache.delete("event:1").await.unwrap());
        cache
            .set_ex("event:1", "{}".to_string(), Duration::from_secs(60))
            .await
            .unwrap();
        assert!(cache.delete("event:1").await.unwrap());
        assert!(!cache.contains("event:1"));
    }

    #[tokio::test]
    async fn failure_toggles_surface_errors() {
        let cache = InMemoryCache::new();
        cache.set_fail_reads(true);
        assert!(cache.get("k").await.is_err());
        cache.set_fail_writes(true);
        assert!(cache.set_ex("k", String::new(), Duration::from_secs(1)).await.is_err());
        cache.set_fail_deletes(true);
        assert!(cache.delete("k").await.is_err());
    }
}
