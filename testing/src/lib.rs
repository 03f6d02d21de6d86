//! # Boxoffice Testing
//!
//! In-memory adapters and helpers for testing the booking service without
//! `PostgreSQL`, Redpanda or Redis.
//!
//! This crate provides:
//! - [`InMemoryStore`]: every relational contract, with a real per-event exclusive
//!   lock so concurrency properties can be exercised
//! - [`InMemoryEventBus`]: topic fan-out with a record of published messages
//! - [`InMemoryCache`]: TTL cache driven by `tokio::time` (works with paused time)
//! - [`FixedClock`] / [`test_clock`]: deterministic time
//! - [`fixtures`]: seed data builders
//!
//! ## Example
//!
//! ```ignore
//! use boxoffice_testing::{fixtures, InMemoryStore};
//!
//! #[tokio::test]
//! async fn books_last_seat() {
//!     let store = InMemoryStore::new();
//!     let user = fixtures::seed_user(&store, "ada@example.com");
//!     let event = fixtures::seed_event(&store, "Gala", 1);
//!     // ... drive an AdmissionController against `store`
//! }
//! ```

pub mod bus;
pub mod cache;
pub mod store;

pub use bus::InMemoryEventBus;
pub use cache::InMemoryCache;
pub use store::InMemoryStore;

use boxoffice_core::environment::Clock;
use chrono::{DateTime, Utc};

/// Mock implementations for testing.
pub mod mocks {
    use super::{Clock, DateTime, Utc};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use boxoffice_testing::mocks::FixedClock;
    /// use boxoffice_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::from_timestamp(1_735_689_600, 0).unwrap_or_default(),
        )
    }
}

/// Seed data for tests.
pub mod fixtures {
    use crate::InMemoryStore;
    use boxoffice_core::types::{Event, EventId, User, UserId};
    use chrono::{Duration, Utc};

    /// Insert a user directly into the store.
    #[must_use]
    pub fn seed_user(store: &InMemoryStore, email: &str) -> User {
        let user = User {
            id: UserId::new(),
            name: email.split('@').next().unwrap_or(email).to_string(),
            email: email.to_string(),
            created_at: Utc::now(),
        };
        store.insert_user(user.clone());
        user
    }

    /// Insert an event with `seats` free seats, dated one week from now.
    #[must_use]
    pub fn seed_event(store: &InMemoryStore, title: &str, seats: i32) -> Event {
        let event = Event {
            id: EventId::new(),
            title: title.to_string(),
            total_seats: seats,
            available_seats: seats,
            event_date: Utc::now() + Duration::days(7),
            created_at: Utc::now(),
        };
        store.insert_event(event.clone());
        event
    }
}

/// Install a `tracing` subscriber for test output. Safe to call repeatedly.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_test_writer()
        .try_init();
}

// Re-export commonly used items
pub use mocks::{FixedClock, test_clock};
