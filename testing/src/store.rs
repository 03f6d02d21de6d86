//! In-memory relational store.
//!
//! Implements every store contract from `boxoffice_core::store` on top of plain
//! collections. Booking transactions get a real exclusive lock per event row
//! (an owned `tokio::sync::Mutex` guard held until commit or rollback), so
//! concurrent admission tests observe the same serialization `PostgreSQL`
//! provides with `SELECT ... FOR UPDATE`.
//!
//! Writes made inside a transaction are buffered and applied atomically on
//! commit; dropping a transaction discards them.
//!
//! Faults can be injected to drive the error paths:
//!
//! - [`InMemoryStore::set_unavailable`]: every operation fails as if the pool were down
//! - [`InMemoryStore::fail_next_commits`]: the next `n` commits fail
//! - [`InMemoryStore::fail_next_appends`]: the next `n` notification appends fail

use boxoffice_core::store::{
    BookingTransaction, EventRepository, NotificationLogStore, RelationalStore, StoreError,
    StoreFuture, UserRepository,
};
use boxoffice_core::types::{
    Booking, Event, EventFilter, EventId, EventUpdate, NewEvent, NewNotificationLog, NewUser,
    NotificationLog, Page, User, UserId,
};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::OwnedMutexGuard;

#[derive(Default)]
struct Tables {
    users: HashMap<UserId, User>,
    events: HashMap<EventId, Event>,
    bookings: Vec<Booking>,
    notifications: Vec<NotificationLog>,
    next_notification_id: i64,
}

#[derive(Default)]
struct Inner {
    tables: Mutex<Tables>,
    row_locks: Mutex<HashMap<EventId, Arc<tokio::sync::Mutex<()>>>>,
    unavailable: AtomicBool,
    fail_commits: AtomicUsize,
    fail_appends: AtomicUsize,
    active_transactions: AtomicUsize,
    commits: AtomicUsize,
    rollbacks: AtomicUsize,
}

impl Inner {
    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn row_lock(&self, event_id: EventId) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.row_locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(event_id).or_default())
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable(
                "connection pool timed out".to_string(),
            ))
        } else {
            Ok(())
        }
    }
}

/// Consume one pending fault from `counter`, if any.
fn take_fault(counter: &AtomicUsize) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

fn window<T>(items: Vec<T>, limit: i64, offset: i64) -> Vec<T> {
    items
        .into_iter()
        .skip(usize::try_from(offset).unwrap_or(0))
        .take(usize::try_from(limit).unwrap_or(0))
        .collect()
}

/// In-memory implementation of every relational contract.
///
/// Cloning is cheap; clones share the same tables.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<Inner>,
}

impl InMemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a user row directly.
    pub fn insert_user(&self, user: User) {
        self.inner.tables().users.insert(user.id, user);
    }

    /// Insert or replace an event row directly.
    pub fn insert_event(&self, event: Event) {
        self.inner.tables().events.insert(event.id, event);
    }

    /// Current state of an event row.
    #[must_use]
    pub fn event(&self, event_id: EventId) -> Option<Event> {
        self.inner.tables().events.get(&event_id).cloned()
    }

    /// Every committed booking, in commit order.
    #[must_use]
    pub fn bookings(&self) -> Vec<Booking> {
        self.inner.tables().bookings.clone()
    }

    /// Every notification log row, in append order.
    #[must_use]
    pub fn notifications(&self) -> Vec<NotificationLog> {
        self.inner.tables().notifications.clone()
    }

    /// Transactions begun and not yet finished or dropped.
    #[must_use]
    pub fn active_transactions(&self) -> usize {
        self.inner.active_transactions.load(Ordering::SeqCst)
    }

    /// Successful commits so far.
    #[must_use]
    pub fn commits(&self) -> usize {
        self.inner.commits.load(Ordering::SeqCst)
    }

    /// Explicit rollbacks so far.
    #[must_use]
    pub fn rollbacks(&self) -> usize {
        self.inner.rollbacks.load(Ordering::SeqCst)
    }

    /// Make every operation fail with [`StoreError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.inner.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Make the next `n` commits fail. Their writes are discarded.
    pub fn fail_next_commits(&self, n: usize) {
        self.inner.fail_commits.store(n, Ordering::SeqCst);
    }

    /// Make the next `n` notification appends fail.
    pub fn fail_next_appends(&self, n: usize) {
        self.inner.fail_appends.store(n, Ordering::SeqCst);
    }
}

impl RelationalStore for InMemoryStore {
    fn begin(&self) -> StoreFuture<'_, Box<dyn BookingTransaction>> {
        Box::pin(async move {
            self.inner.check_available()?;
            self.inner.active_transactions.fetch_add(1, Ordering::SeqCst);
            let tx: Box<dyn BookingTransaction> = Box::new(InMemoryTransaction {
                store: Arc::clone(&self.inner),
                guards: HashMap::new(),
                decrements: Vec::new(),
                bookings: Vec::new(),
            });
            Ok(tx)
        })
    }
}

/// Transaction over [`InMemoryStore`].
///
/// Row guards live in `guards` and are released when the transaction is
/// consumed or dropped.
struct InMemoryTransaction {
    store: Arc<Inner>,
    guards: HashMap<EventId, OwnedMutexGuard<()>>,
    decrements: Vec<EventId>,
    bookings: Vec<Booking>,
}

impl InMemoryTransaction {
    fn pending_decrements(&self, event_id: EventId) -> i32 {
        let count = self.decrements.iter().filter(|id| **id == event_id).count();
        i32::try_from(count).unwrap_or(i32::MAX)
    }

    /// Validate and apply buffered writes under a single table lock.
    fn apply(&self) -> Result<(), StoreError> {
        let mut tables = self.store.tables();

        for event_id in &self.decrements {
            let event = tables
                .events
                .get(event_id)
                .ok_or_else(|| StoreError::Database(format!("event {event_id} vanished")))?;
            if event.available_seats - self.pending_decrements(*event_id) < 0 {
                return Err(StoreError::Database(
                    "check constraint \"events_seats_check\" violated".to_string(),
                ));
            }
        }
        for booking in &self.bookings {
            if !tables.users.contains_key(&booking.user_id)
                || !tables.events.contains_key(&booking.event_id)
            {
                return Err(StoreError::Database(
                    "foreign key constraint violated on bookings".to_string(),
                ));
            }
        }

        for event_id in &self.decrements {
            if let Some(event) = tables.events.get_mut(event_id) {
                event.available_seats -= 1;
            }
        }
        tables.bookings.extend(self.bookings.iter().cloned());
        Ok(())
    }
}

impl Drop for InMemoryTransaction {
    fn drop(&mut self) {
        self.store.active_transactions.fetch_sub(1, Ordering::SeqCst);
    }
}

impl BookingTransaction for InMemoryTransaction {
    fn user_exists(&mut self, user_id: UserId) -> StoreFuture<'_, bool> {
        Box::pin(async move {
            self.store.check_available()?;
            Ok(self.store.tables().users.contains_key(&user_id))
        })
    }

    fn lock_event(&mut self, event_id: EventId) -> StoreFuture<'_, Option<i32>> {
        Box::pin(async move {
            self.store.check_available()?;
            let exists = self.store.tables().events.contains_key(&event_id);
            if !exists {
                return Ok(None);
            }

            if !self.guards.contains_key(&event_id) {
                let guard = self.store.row_lock(event_id).lock_owned().await;
                self.guards.insert(event_id, guard);
            }

            let seats = self
                .store
                .tables()
                .events
                .get(&event_id)
                .map(|event| event.available_seats);
            Ok(seats.map(|seats| seats - self.pending_decrements(event_id)))
        })
    }

    fn decrement_seats(&mut self, event_id: EventId) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            self.store.check_available()?;
            self.decrements.push(event_id);
            Ok(())
        })
    }

    fn insert_booking(&mut self, booking: &Booking) -> StoreFuture<'_, ()> {
        let booking = booking.clone();
        Box::pin(async move {
            self.store.check_available()?;
            self.bookings.push(booking);
            Ok(())
        })
    }

    fn commit(self: Box<Self>) -> StoreFuture<'static, ()> {
        Box::pin(async move {
            self.store.check_available()?;
            if take_fault(&self.store.fail_commits) {
                return Err(StoreError::Database("commit failed".to_string()));
            }
            self.apply()?;
            self.store.commits.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }

    fn rollback(self: Box<Self>) -> StoreFuture<'static, ()> {
        Box::pin(async move {
            self.store.rollbacks.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }
}

impl UserRepository for InMemoryStore {
    fn create_user(&self, user: NewUser) -> StoreFuture<'_, User> {
        Box::pin(async move {
            self.inner.check_available()?;
            let mut tables = self.inner.tables();
            if tables.users.values().any(|u| u.email == user.email) {
                return Err(StoreError::UniqueViolation(format!(
                    "email {} already registered",
                    user.email
                )));
            }
            let created = User {
                id: UserId::new(),
                name: user.name,
                email: user.email,
                created_at: Utc::now(),
            };
            tables.users.insert(created.id, created.clone());
            Ok(created)
        })
    }

    fn get_user(&self, user_id: UserId) -> StoreFuture<'_, Option<User>> {
        Box::pin(async move {
            self.inner.check_available()?;
            Ok(self.inner.tables().users.get(&user_id).cloned())
        })
    }

    fn list_users(&self, limit: i64, offset: i64) -> StoreFuture<'_, Page<User>> {
        Box::pin(async move {
            self.inner.check_available()?;
            let mut users: Vec<User> = self.inner.tables().users.values().cloned().collect();
            users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(Page {
                items: window(users, limit, offset),
                limit,
                offset,
            })
        })
    }
}

impl EventRepository for InMemoryStore {
    fn create_event(&self, event: NewEvent) -> StoreFuture<'_, Event> {
        Box::pin(async move {
            self.inner.check_available()?;
            let created = Event {
                id: EventId::new(),
                title: event.title,
                total_seats: event.seats,
                available_seats: event.seats,
                event_date: event.event_date,
                created_at: Utc::now(),
            };
            self.inner
                .tables()
                .events
                .insert(created.id, created.clone());
            Ok(created)
        })
    }

    fn get_event(&self, event_id: EventId) -> StoreFuture<'_, Option<Event>> {
        Box::pin(async move {
            self.inner.check_available()?;
            Ok(self.inner.tables().events.get(&event_id).cloned())
        })
    }

    fn list_events(&self, filter: EventFilter) -> StoreFuture<'_, Page<Event>> {
        Box::pin(async move {
            self.inner.check_available()?;
            let needle = filter.q.as_deref().map(str::to_lowercase);
            let mut events: Vec<Event> = self
                .inner
                .tables()
                .events
                .values()
                .filter(|e| {
                    needle
                        .as_deref()
                        .is_none_or(|q| e.title.to_lowercase().contains(q))
                })
                .filter(|e| filter.from.is_none_or(|from| e.event_date >= from))
                .filter(|e| filter.to.is_none_or(|to| e.event_date <= to))
                .cloned()
                .collect();
            events.sort_by(|a, b| a.event_date.cmp(&b.event_date));
            Ok(Page {
                items: window(events, filter.limit, filter.offset),
                limit: filter.limit,
                offset: filter.offset,
            })
        })
    }

    fn update_event(&self, event_id: EventId, update: EventUpdate) -> StoreFuture<'_, bool> {
        Box::pin(async move {
            self.inner.check_available()?;
            let mut tables = self.inner.tables();
            let Some(event) = tables.events.get_mut(&event_id) else {
                return Ok(false);
            };
            if let Some(title) = update.title {
                event.title = title;
            }
            if let Some(date) = update.event_date {
                event.event_date = date;
            }
            Ok(true)
        })
    }
}

impl NotificationLogStore for InMemoryStore {
    fn append(&self, entry: NewNotificationLog) -> StoreFuture<'_, NotificationLog> {
        Box::pin(async move {
            self.inner.check_available()?;
            if take_fault(&self.inner.fail_appends) {
                return Err(StoreError::Database(
                    "insert into notification_logs failed".to_string(),
                ));
            }
            let mut tables = self.inner.tables();
            tables.next_notification_id += 1;
            let row = NotificationLog {
                id: tables.next_notification_id,
                booking_id: entry.booking_id,
                user_id: entry.user_id,
                event_id: entry.event_id,
                message: entry.message,
                created_at: Utc::now(),
            };
            tables.notifications.push(row.clone());
            Ok(row)
        })
    }

    fn latest(&self, limit: i64) -> StoreFuture<'_, Vec<NotificationLog>> {
        Box::pin(async move {
            self.inner.check_available()?;
            let mut rows = self.inner.tables().notifications.clone();
            rows.sort_by(|a, b| b.id.cmp(&a.id));
            Ok(window(rows, limit, 0))
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::fixtures;
    use boxoffice_core::types::BookingId;
    use std::time::Duration;

    fn booking_for(user: &User, event: &Event) -> Booking {
        Booking {
            id: BookingId::new(),
            user_id: user.id,
            event_id: event.id,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn committed_writes_become_visible() {
        let store = InMemoryStore::new();
        let user = fixtures::seed_user(&store, "ada@example.com");
        let event = fixtures::seed_event(&store, "Gala", 2);

        let mut tx = store.begin().await.unwrap();
        assert!(tx.user_exists(user.id).await.unwrap());
        assert_eq!(tx.lock_event(event.id).await.unwrap(), Some(2));
        tx.decrement_seats(event.id).await.unwrap();
        tx.insert_booking(&booking_for(&user, &event)).await.unwrap();

        // Nothing visible before commit.
        assert_eq!(store.event(event.id).unwrap().available_seats, 2);
        assert!(store.bookings().is_empty());

        tx.commit().await.unwrap();
        assert_eq!(store.event(event.id).unwrap().available_seats, 1);
        assert_eq!(store.bookings().len(), 1);
        assert_eq!(store.active_transactions(), 0);
    }

    #[tokio::test]
    async fn dropped_transaction_discards_writes() {
        let store = InMemoryStore::new();
        let user = fixtures::seed_user(&store, "ada@example.com");
        let event = fixtures::seed_event(&store, "Gala", 2);

        {
            let mut tx = store.begin().await.unwrap();
            tx.lock_event(event.id).await.unwrap();
            tx.decrement_seats(event.id).await.unwrap();
            tx.insert_booking(&booking_for(&user, &event)).await.unwrap();
        }

        assert_eq!(store.event(event.id).unwrap().available_seats, 2);
        assert!(store.bookings().is_empty());
        assert_eq!(store.active_transactions(), 0);
    }

    #[tokio::test]
    async fn row_lock_blocks_second_transaction_until_release() {
        let store = InMemoryStore::new();
        let event_id = fixtures::seed_event(&store, "Gala", 1).id;

        let mut first = store.begin().await.unwrap();
        first.lock_event(event_id).await.unwrap();

        let contender = store.clone();
        let mut handle = tokio::spawn(async move {
            let mut second = contender.begin().await.unwrap();
            second.lock_event(event_id).await.unwrap()
        });

        let blocked = tokio::time::timeout(Duration::from_millis(50), &mut handle).await;
        assert!(blocked.is_err(), "second locker should wait");

        first.decrement_seats(event_id).await.unwrap();
        first.commit().await.unwrap();

        let seen = handle.await.unwrap();
        assert_eq!(seen, Some(0));
    }

    #[tokio::test]
    async fn missing_event_takes_no_lock() {
        let store = InMemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        assert_eq!(tx.lock_event(EventId::new()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn commit_refuses_to_oversell() {
        let store = InMemoryStore::new();
        let event = fixtures::seed_event(&store, "Tiny", 1);

        let mut tx = store.begin().await.unwrap();
        tx.lock_event(event.id).await.unwrap();
        tx.decrement_seats(event.id).await.unwrap();
        tx.decrement_seats(event.id).await.unwrap();

        assert!(matches!(tx.commit().await, Err(StoreError::Database(_))));
        assert_eq!(store.event(event.id).unwrap().available_seats, 1);
    }

    #[tokio::test]
    async fn injected_faults_are_consumed() {
        let store = InMemoryStore::new();
        store.fail_next_commits(1);

        let tx = store.begin().await.unwrap();
        assert!(tx.commit().await.is_err());
        let tx = store.begin().await.unwrap();
        assert!(tx.commit().await.is_ok());

        store.set_unavailable(true);
        assert!(matches!(
            store.begin().await.err(),
            Some(StoreError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let store = InMemoryStore::new();
        let new = NewUser {
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
        };
        store.create_user(new.clone()).await.unwrap();
        assert!(matches!(
            store.create_user(new).await,
            Err(StoreError::UniqueViolation(_))
        ));
    }

    #[tokio::test]
    async fn list_events_filters_and_orders_by_date() {
        let store = InMemoryStore::new();
        let base = Utc::now();
        for (title, days) in [("Jazz Night", 3), ("Rock Show", 1), ("jazz brunch", 2)] {
            store
                .create_event(NewEvent {
                    title: title.to_string(),
                    seats: 10,
                    event_date: base + chrono::Duration::days(days),
                })
                .await
                .unwrap();
        }

        let page = store
            .list_events(EventFilter {
                q: Some("JAZZ".to_string()),
                ..EventFilter::default()
            })
            .await
            .unwrap();
        let titles: Vec<_> = page.items.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["jazz brunch", "Jazz Night"]);

        let page = store
            .list_events(EventFilter {
                from: Some(base + chrono::Duration::days(2)),
                to: Some(base + chrono::Duration::days(2)),
                ..EventFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(page.items.len(), 1);
    }

    #[tokio::test]
    async fn notification_log_is_newest_first() {
        let store = InMemoryStore::new();
        for n in 0..3 {
            store
                .append(NewNotificationLog {
                    booking_id: BookingId::new(),
                    user_id: UserId::new(),
                    event_id: EventId::new(),
                    message: format!("m{n}"),
                })
                .await
                .unwrap();
        }
        let latest = store.latest(2).await.unwrap();
        assert_eq!(latest.len(), 2);
        assert_eq!(latest[0].message, "m2");
        assert!(latest[0].id > latest[1].id);
    }
}
