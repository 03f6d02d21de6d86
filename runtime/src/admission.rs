//! Seat admission control.
//!
//! [`AdmissionController::book`] is the only path that decrements an event's
//! available seats. Each request runs one short transaction:
//!
//! ```text
//! begin
//!   ├─ user exists?            no ──► rollback, NotFound(User)
//!   ├─ lock event row          none ► rollback, NotFound(Event)
//!   ├─ available_seats > 0?    no ──► rollback, SoldOut
//!   ├─ decrement seats
//!   └─ insert booking
//! commit
//!   └─ spawn publish(booking.confirmed)   best effort, never undoes the commit
//! ```
//!
//! Concurrent requests for the same event serialize on the row lock, so with
//! `S` seats and `K > S` simultaneous requests exactly `S` succeed and the rest
//! see `SoldOut`. Requests for different events never contend.

use crate::metrics::{BookingMetrics, BookingOutcome};
use boxoffice_core::environment::Clock;
use boxoffice_core::error::{BookingError, NotFound};
use boxoffice_core::event_bus::{BusMessage, EventBus};
use boxoffice_core::message::{BOOKING_CONFIRMED_TOPIC, BookingConfirmed};
use boxoffice_core::store::{BookingTransaction, RelationalStore};
use boxoffice_core::types::{Booking, BookingConfirmation, BookingId, EventId, UserId};
use std::sync::Arc;
use std::time::Instant;

/// Decides whether a booking request gets a seat.
///
/// Cheap to clone; every field is shared.
#[derive(Clone)]
pub struct AdmissionController {
    store: Arc<dyn RelationalStore>,
    bus: Arc<dyn EventBus>,
    clock: Arc<dyn Clock>,
    topic: String,
}

impl AdmissionController {
    /// Create a controller publishing to `booking.confirmed`.
    #[must_use]
    pub fn new(
        store: Arc<dyn RelationalStore>,
        bus: Arc<dyn EventBus>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            bus,
            clock,
            topic: BOOKING_CONFIRMED_TOPIC.to_string(),
        }
    }

    /// Publish confirmations to a different topic.
    #[must_use]
    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = topic.into();
        self
    }

    /// Topic confirmations are published to.
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Try to book one seat of `event_id` for `user_id`.
    ///
    /// Identifiers that are not UUIDs are treated as unknown entities.
    ///
    /// # Errors
    ///
    /// - [`BookingError::NotFound`] if the user or the event does not exist
    /// - [`BookingError::SoldOut`] if the event has no seat left
    /// - [`BookingError::Internal`] if the store fails at any step
    ///
    /// In every error case the transaction was rolled back and no state changed.
    pub async fn book(
        &self,
        user_id: &str,
        event_id: &str,
    ) -> Result<BookingConfirmation, BookingError> {
        let started = Instant::now();
        let result = self.admit(user_id, event_id).await;

        let outcome = match &result {
            Ok(_) => BookingOutcome::Accepted,
            Err(BookingError::SoldOut { .. }) => BookingOutcome::SoldOut,
            Err(BookingError::NotFound(_)) => BookingOutcome::NotFound,
            Err(BookingError::Internal(_)) => BookingOutcome::Error,
        };
        BookingMetrics::record(outcome, started.elapsed());

        match result {
            Ok(booking) => {
                tracing::info!(
                    booking_id = %booking.id,
                    user_id = %booking.user_id,
                    event_id = %booking.event_id,
                    "Booking confirmed"
                );
                self.spawn_publish(&booking);
                Ok(BookingConfirmation::from(&booking))
            }
            Err(err) => {
                match &err {
                    BookingError::Internal(reason) => {
                        tracing::error!(user_id, event_id, error = %reason, "Booking failed");
                    }
                    other => tracing::debug!(user_id, event_id, reason = %other, "Booking rejected"),
                }
                Err(err)
            }
        }
    }

    async fn admit(&self, user_id: &str, event_id: &str) -> Result<Booking, BookingError> {
        let user = user_id
            .parse::<UserId>()
            .map_err(|_| NotFound::User(user_id.to_string()))?;
        let event = event_id.parse::<EventId>().ok();

        let mut tx = self.store.begin().await?;
        match self.admit_in(tx.as_mut(), user, event, event_id).await {
            Ok(booking) => {
                tx.commit().await?;
                Ok(booking)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::warn!(error = %rollback_err, "Rollback failed");
                }
                Err(err)
            }
        }
    }

    async fn admit_in(
        &self,
        tx: &mut dyn BookingTransaction,
        user_id: UserId,
        event_id: Option<EventId>,
        raw_event_id: &str,
    ) -> Result<Booking, BookingError> {
        if !tx.user_exists(user_id).await? {
            return Err(NotFound::User(user_id.to_string()).into());
        }

        let event_id = event_id.ok_or_else(|| NotFound::Event(raw_event_id.to_string()))?;
        let available = tx
            .lock_event(event_id)
            .await?
            .ok_or_else(|| NotFound::Event(event_id.to_string()))?;
        if available <= 0 {
            return Err(BookingError::SoldOut {
                event_id: event_id.to_string(),
            });
        }

        tx.decrement_seats(event_id).await?;

        let booking = Booking {
            id: BookingId::new(),
            user_id,
            event_id,
            created_at: self.clock.now(),
        };
        tx.insert_booking(&booking).await?;
        Ok(booking)
    }

    fn spawn_publish(&self, booking: &Booking) {
        let message = BookingConfirmed::for_booking(booking, self.clock.now());
        let bus = Arc::clone(&self.bus);
        let topic = self.topic.clone();
        tokio::spawn(async move {
            publish_confirmation(bus.as_ref(), &topic, &message).await;
        });
    }
}

/// Publish one confirmation. Failures are logged and counted, never returned.
async fn publish_confirmation(bus: &dyn EventBus, topic: &str, message: &BookingConfirmed) {
    let payload = match message.to_payload() {
        Ok(payload) => payload,
        Err(e) => {
            tracing::warn!(booking_id = %message.booking_id, error = %e, "Failed to encode confirmation");
            BookingMetrics::record_publish_failure();
            return;
        }
    };

    let bus_message = BusMessage::new(payload).with_key(message.key());
    if let Err(e) = bus.publish(topic, &bus_message).await {
        tracing::warn!(
            booking_id = %message.booking_id,
            topic,
            error = %e,
            "Failed to publish booking confirmation"
        );
        BookingMetrics::record_publish_failure();
    } else {
        tracing::debug!(booking_id = %message.booking_id, topic, "Booking confirmation published");
    }
}
