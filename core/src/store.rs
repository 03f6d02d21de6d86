//! Relational store contracts.
//!
//! The relational store is the source of truth for users, events, bookings and
//! notification logs. Only the booking transaction needs more than single-statement
//! atomicity, so it gets its own pair of traits:
//!
//! - [`RelationalStore`] opens a transaction scope.
//! - [`BookingTransaction`] is that scope: it can check a user, take an exclusive
//!   lock on one event row, decrement its seat counter, insert a booking, and
//!   finally commit or roll back.
//!
//! The remaining traits cover the simple get/put/list collaborators around the core.
//!
//! # Implementations
//!
//! - **`PgStore`** (`boxoffice-postgres`): `SELECT ... FOR UPDATE` inside a sqlx transaction
//! - **`InMemoryStore`** (`boxoffice-testing`): per-event async mutex held until commit
//!
//! # Dyn Compatibility
//!
//! Every trait returns explicit `Pin<Box<dyn Future>>` values instead of using
//! `async fn` so the runtime can hold them as `Arc<dyn ...>`.

use crate::types::{
    Booking, Event, EventFilter, EventId, EventUpdate, NewEvent, NewNotificationLog, NewUser,
    NotificationLog, Page, User, UserId,
};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Boxed future returned by every store operation.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

/// Errors raised by relational store adapters.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Could not obtain a connection (pool exhausted, database down).
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// A statement failed.
    #[error("Database error: {0}")]
    Database(String),

    /// A uniqueness constraint rejected the write.
    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    /// A row could not be mapped into a domain type.
    #[error("Decode error: {0}")]
    Decode(String),
}

/// Opens booking transactions.
pub trait RelationalStore: Send + Sync {
    /// Begin a new transaction scope.
    ///
    /// The returned transaction owns its connection until it is committed,
    /// rolled back, or dropped. Dropping without committing rolls back.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if no connection can be acquired.
    fn begin(&self) -> StoreFuture<'_, Box<dyn BookingTransaction>>;
}

/// One open booking transaction.
///
/// # Locking
///
/// [`lock_event`](Self::lock_event) takes an exclusive lock on the event row.
/// Any other transaction calling `lock_event` for the same event blocks until
/// this one commits, rolls back, or is dropped. Locks on different events never
/// contend.
pub trait BookingTransaction: Send {
    /// Whether a user with this id exists.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the lookup fails.
    fn user_exists(&mut self, user_id: UserId) -> StoreFuture<'_, bool>;

    /// Lock the event row and read its available seats.
    ///
    /// Returns `None` if the event does not exist (no lock is held in that case).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the locking read fails.
    fn lock_event(&mut self, event_id: EventId) -> StoreFuture<'_, Option<i32>>;

    /// Decrement the locked event's available seats by exactly one.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the update fails.
    fn decrement_seats(&mut self, event_id: EventId) -> StoreFuture<'_, ()>;

    /// Insert the booking row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the insert fails.
    fn insert_booking(&mut self, booking: &Booking) -> StoreFuture<'_, ()>;

    /// Make every write durable and release the lock and connection.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the commit fails; nothing is persisted then.
    fn commit(self: Box<Self>) -> StoreFuture<'static, ()>;

    /// Discard every write and release the lock and connection.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the rollback statement fails. The connection is
    /// released regardless.
    fn rollback(self: Box<Self>) -> StoreFuture<'static, ()>;
}

/// User records (non-core collaborator).
pub trait UserRepository: Send + Sync {
    /// Create a user.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UniqueViolation`] if the email is taken.
    fn create_user(&self, user: NewUser) -> StoreFuture<'_, User>;

    /// Fetch a user by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the lookup fails.
    fn get_user(&self, user_id: UserId) -> StoreFuture<'_, Option<User>>;

    /// List users, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query fails.
    fn list_users(&self, limit: i64, offset: i64) -> StoreFuture<'_, Page<User>>;
}

/// Event metadata (non-core collaborator).
pub trait EventRepository: Send + Sync {
    /// Create an event with `available_seats == total_seats`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the insert fails.
    fn create_event(&self, event: NewEvent) -> StoreFuture<'_, Event>;

    /// Fetch an event by id (plain read, no lock).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the lookup fails.
    fn get_event(&self, event_id: EventId) -> StoreFuture<'_, Option<Event>>;

    /// List events ordered by date ascending.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query fails.
    fn list_events(&self, filter: EventFilter) -> StoreFuture<'_, Page<Event>>;

    /// Update title and/or date. Returns `false` when no row matched.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the update fails.
    fn update_event(&self, event_id: EventId, update: EventUpdate) -> StoreFuture<'_, bool>;
}

/// Append-only notification audit log.
pub trait NotificationLogStore: Send + Sync {
    /// Append one row. No uniqueness is enforced on the booking id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the insert fails.
    fn append(&self, entry: NewNotificationLog) -> StoreFuture<'_, NotificationLog>;

    /// Most recent rows, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query fails.
    fn latest(&self, limit: i64) -> StoreFuture<'_, Vec<NotificationLog>>;
}
