//! # Boxoffice Core
//!
//! Domain types and adapter contracts for the boxoffice booking service.
//!
//! The service admits seat bookings against capacity-limited events and
//! notifies downstream consumers of every confirmed booking:
//!
//! ```text
//! client ──▶ AdmissionController ──▶ RelationalStore transaction
//!                                        │ (row lock on the event)
//!                                        ▼
//!                                     commit
//!                                        │
//!                                        ▼
//!                     EventBus "booking.confirmed" (best effort)
//!                                        │
//!                                        ▼
//!                  NotificationConsumer ──▶ notification_logs
//! ```
//!
//! This crate holds no I/O. Every collaborator is a trait so the runtime can be
//! wired against `PostgreSQL`, Redpanda and Redis in production and against the
//! in-memory doubles of `boxoffice-testing` in tests.
//!
//! ## Modules
//!
//! - [`types`]: identifiers and records (users, events, bookings, notification logs)
//! - [`message`]: the `booking.confirmed` wire payload
//! - [`store`]: relational store contracts, including the booking transaction
//! - [`cache`]: the key-value cache used by the event reader
//! - [`event_bus`]: publish/subscribe transport
//! - [`error`]: business errors shared across crates

pub use chrono::{DateTime, Utc};

pub mod cache;
pub mod error;
pub mod event_bus;
pub mod message;
pub mod store;
pub mod types;

pub use error::{BookingError, NotFound, ValidationError};
pub use types::{
    Booking, BookingConfirmation, BookingId, Event, EventFilter, EventId, EventUpdate, NewEvent,
    NewUser, NotificationLog, NewNotificationLog, Page, User, UserId,
};

/// Environment module - injected dependencies that are not storage
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```
    /// use boxoffice_core::environment::{Clock, SystemClock};
    ///
    /// let clock = SystemClock;
    /// let _now = clock.now();
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Wall-clock time.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}
