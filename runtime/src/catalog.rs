//! Read-through cache for event metadata.
//!
//! Reads check `event:{id}` first and fall back to the store, filling the
//! cache with a TTL on a miss. Metadata updates go to the store and then drop
//! the cached entry. Seat decrements never touch the cache, so a cached
//! `available_seats` can lag behind the store for up to one TTL.

use crate::metrics::CacheMetrics;
use boxoffice_core::cache::{CacheError, CacheStore, event_key};
use boxoffice_core::error::NotFound;
use boxoffice_core::store::{EventRepository, StoreError};
use boxoffice_core::types::{Event, EventId, EventUpdate};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors from [`EventCatalog`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// No such event.
    #[error(transparent)]
    NotFound(#[from] NotFound),

    /// The store failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The update was stored but the cached entry could not be dropped.
    #[error("cache invalidation failed: {0}")]
    Invalidation(CacheError),
}

/// An event read plus whether it came from the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedEvent {
    /// The event payload
    pub event: Event,
    /// `true` when served from the cache
    pub cached: bool,
}

/// Event reader and metadata writer in front of the cache.
#[derive(Clone)]
pub struct EventCatalog {
    events: Arc<dyn EventRepository>,
    cache: Arc<dyn CacheStore>,
    ttl: Duration,
}

impl EventCatalog {
    /// Default time-to-live for cached events.
    pub const DEFAULT_TTL: Duration = Duration::from_secs(60);

    /// Create a catalog with the default TTL.
    #[must_use]
    pub fn new(events: Arc<dyn EventRepository>, cache: Arc<dyn CacheStore>) -> Self {
        Self {
            events,
            cache,
            ttl: Self::DEFAULT_TTL,
        }
    }

    /// Override the TTL.
    #[must_use]
    pub const fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Read an event, preferring the cache.
    ///
    /// Cache failures are logged and the read falls through to the store.
    ///
    /// # Errors
    ///
    /// - [`CatalogError::NotFound`] if the id is not a UUID or no event has it
    /// - [`CatalogError::Store`] if the store read fails
    pub async fn get(&self, event_id: &str) -> Result<CachedEvent, CatalogError> {
        let id: EventId = event_id
            .parse()
            .map_err(|_| NotFound::Event(event_id.to_string()))?;
        let key = event_key(id);

        if let Some(event) = self.read_cached(&key).await {
            CacheMetrics::record_hit();
            return Ok(CachedEvent {
                event,
                cached: true,
            });
        }
        CacheMetrics::record_miss();

        let event = self
            .events
            .get_event(id)
            .await?
            .ok_or_else(|| NotFound::Event(id.to_string()))?;

        self.write_cached(&key, &event).await;
        Ok(CachedEvent {
            event,
            cached: false,
        })
    }

    /// Apply a metadata update and drop the cached entry.
    ///
    /// # Errors
    ///
    /// - [`CatalogError::NotFound`] if the id is not a UUID or no event has it
    /// - [`CatalogError::Store`] if the store update fails
    /// - [`CatalogError::Invalidation`] if the cache entry could not be removed
    pub async fn update(&self, event_id: &str, update: EventUpdate) -> Result<(), CatalogError> {
        let id: EventId = event_id
            .parse()
            .map_err(|_| NotFound::Event(event_id.to_string()))?;

        if !self.events.update_event(id, update).await? {
            return Err(NotFound::Event(id.to_string()).into());
        }

        self.cache.delete(&event_key(id)).await.map_err(|e| {
            CacheMetrics::record_error("delete");
            tracing::error!(event_id = %id, error = %e, "Failed to invalidate cached event");
            CatalogError::Invalidation(e)
        })?;

        tracing::debug!(event_id = %id, "Event updated, cache invalidated");
        Ok(())
    }

    async fn read_cached(&self, key: &str) -> Option<Event> {
        let raw = match self.cache.get(key).await {
            Ok(raw) => raw?,
            Err(e) => {
                CacheMetrics::record_error("get");
                tracing::warn!(key, error = %e, "Cache read failed, reading from store");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(event) => Some(event),
            Err(e) => {
                tracing::warn!(key, error = %e, "Discarding undecodable cache entry");
                None
            }
        }
    }

    async fn write_cached(&self, key: &str, event: &Event) {
        let raw = match serde_json::to_string(event) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(key, error = %e, "Failed to encode event for cache");
                return;
            }
        };

        if let Err(e) = self.cache.set_ex(key, raw, self.ttl).await {
            CacheMetrics::record_error("set");
            tracing::warn!(key, error = %e, "Cache write failed");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use boxoffice_testing::{InMemoryCache, InMemoryStore, fixtures};

    fn catalog(store: &InMemoryStore, cache: &InMemoryCache) -> EventCatalog {
        EventCatalog::new(Arc::new(store.clone()), Arc::new(cache.clone()))
    }

    #[tokio::test]
    async fn second_read_is_served_from_cache() {
        let store = InMemoryStore::new();
        let cache = InMemoryCache::new();
        let event = fixtures::seed_event(&store, "Gala", 5);
        let catalog = catalog(&store, &cache);

        let first = catalog.get(&event.id.to_string()).await.unwrap();
        let second = catalog.get(&event.id.to_string()).await.unwrap();

        assert!(!first.cached);
        assert!(second.cached);
        assert_eq!(first.event, second.event);
    }

    #[tokio::test]
    async fn update_invalidates_cached_entry() {
        let store = InMemoryStore::new();
        let cache = InMemoryCache::new();
        let event = fixtures::seed_event(&store, "Gala", 5);
        let catalog = catalog(&store, &cache);
        let id = event.id.to_string();

        catalog.get(&id).await.unwrap();
        catalog
            .update(
                &id,
                EventUpdate {
                    title: Some("Gala Night".to_string()),
                    event_date: None,
                },
            )
            .await
            .unwrap();

        let after = catalog.get(&id).await.unwrap();
        assert!(!after.cached);
        assert_eq!(after.event.title, "Gala Night");
    }

    #[tokio::test]
    async fn cache_outage_degrades_to_store_reads() {
        let store = InMemoryStore::new();
        let cache = InMemoryCache::new();
        let event = fixtures::seed_event(&store, "Gala", 5);
        cache.set_fail_reads(true);
        cache.set_fail_writes(true);

        let read = catalog(&store, &cache)
            .get(&event.id.to_string())
            .await
            .unwrap();
        assert!(!read.cached);
        assert_eq!(read.event.id, event.id);
    }

    #[tokio::test]
    async fn failed_invalidation_is_reported() {
        let store = InMemoryStore::new();
        let cache = InMemoryCache::new();
        let event = fixtures::seed_event(&store, "Gala", 5);
        cache.set_fail_deletes(true);

        let err = catalog(&store, &cache)
            .update(
                &event.id.to_string(),
                EventUpdate {
                    title: Some("New".to_string()),
                    event_date: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::Invalidation(_)));
    }

    #[tokio::test]
    async fn unknown_and_malformed_ids_are_not_found() {
        let store = InMemoryStore::new();
        let cache = InMemoryCache::new();
        let catalog = catalog(&store, &cache);

        assert!(matches!(
            catalog.get("nope").await,
            Err(CatalogError::NotFound(_))
        ));
        assert!(matches!(
            catalog.get(&EventId::new().to_string()).await,
            Err(CatalogError::NotFound(_))
        ));
        assert!(matches!(
            catalog
                .update(
                    &EventId::new().to_string(),
                    EventUpdate {
                        title: Some("x".to_string()),
                        event_date: None
                    }
                )
                .await,
            Err(CatalogError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn seat_changes_do_not_touch_the_cache() {
        let store = InMemoryStore::new();
        let cache = InMemoryCache::new();
        let mut event = fixtures::seed_event(&store, "Gala", 5);
        let catalog = catalog(&store, &cache);
        let id = event.id.to_string();

        catalog.get(&id).await.unwrap();
        event.available_seats = 4;
        store.insert_event(event);

        let stale = catalog.get(&id).await.unwrap();
        assert!(stale.cached);
        assert_eq!(stale.event.available_seats, 5);
    }
}
