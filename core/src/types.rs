//! Identifiers and records shared by every crate in the workspace.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            #[doc = concat!("Creates a new random `", stringify!($name), "`")]
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            #[doc = concat!("Create a `", stringify!($name), "` from a `Uuid`")]
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Get the inner UUID
            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s.trim()).map(Self)
            }
        }
    };
}

uuid_id!(
    /// Unique identifier for a user
    UserId
);
uuid_id!(
    /// Unique identifier for an event
    EventId
);
uuid_id!(
    /// Unique identifier for a booking
    BookingId
);

// ============================================================================
// Records
// ============================================================================

/// A registered user. Bookings reference users but never mutate them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// User ID
    pub id: UserId,
    /// Display name
    pub name: String,
    /// Email address (unique across users)
    pub email: String,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

/// Input for creating a user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewUser {
    /// Display name
    pub name: String,
    /// Email address
    pub email: String,
}

/// A capacity-limited event.
///
/// `available_seats` only ever moves through the admission controller's
/// decrement step and always satisfies `0 <= available_seats <= total_seats`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Event ID
    pub id: EventId,
    /// Event title
    pub title: String,
    /// Capacity fixed at creation
    pub total_seats: i32,
    /// Seats not yet booked
    pub available_seats: i32,
    /// When the event takes place
    pub event_date: DateTime<Utc>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Event {
    /// Whether the seat counters respect `0 <= available <= total`.
    #[must_use]
    pub const fn seats_within_bounds(&self) -> bool {
        self.available_seats >= 0 && self.available_seats <= self.total_seats
    }
}

/// Input for creating an event. Both seat counters start at `seats`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewEvent {
    /// Event title
    pub title: String,
    /// Capacity
    pub seats: i32,
    /// When the event takes place
    pub event_date: DateTime<Utc>,
}

/// Metadata changes for an existing event. Seat counters are not editable.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EventUpdate {
    /// New title
    pub title: Option<String>,
    /// New date
    pub event_date: Option<DateTime<Utc>>,
}

impl EventUpdate {
    /// True when neither field is set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none() && self.event_date.is_none()
    }
}

/// Filters and pagination for listing events.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventFilter {
    /// Case-insensitive substring of the title
    pub q: Option<String>,
    /// Inclusive lower bound on `event_date`
    pub from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `event_date`
    pub to: Option<DateTime<Utc>>,
    /// Page size
    pub limit: i64,
    /// Rows to skip
    pub offset: i64,
}

impl Default for EventFilter {
    fn default() -> Self {
        Self {
            q: None,
            from: None,
            to: None,
            limit: Page::<()>::DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

/// A page of results.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    /// Items on this page
    pub items: Vec<T>,
    /// Page size that was applied
    pub limit: i64,
    /// Offset that was applied
    pub offset: i64,
}

impl<T> Page<T> {
    /// Page size used when the caller gives none (or an unusable one).
    pub const DEFAULT_LIMIT: i64 = 20;
    /// Largest page size a caller may request.
    pub const MAX_LIMIT: i64 = 100;

    /// Normalize a raw `limit` query value: unparsable or zero falls back to the
    /// default, everything else is clamped to `1..=MAX_LIMIT`.
    #[must_use]
    pub fn clamp_limit(raw: Option<&str>) -> i64 {
        match raw.and_then(|s| s.trim().parse::<i64>().ok()) {
            None | Some(0) => Self::DEFAULT_LIMIT,
            Some(n) => n.clamp(1, Self::MAX_LIMIT),
        }
    }

    /// Normalize a raw `offset` query value: unparsable falls back to 0 and
    /// negatives are raised to 0.
    #[must_use]
    pub fn clamp_offset(raw: Option<&str>) -> i64 {
        raw.and_then(|s| s.trim().parse::<i64>().ok())
            .unwrap_or(0)
            .max(0)
    }
}

/// An accepted booking. Immutable and never deleted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    /// Booking ID
    pub id: BookingId,
    /// Who booked
    pub user_id: UserId,
    /// What was booked
    pub event_id: EventId,
    /// When the booking was admitted
    pub created_at: DateTime<Utc>,
}

/// Response of a successful admission.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingConfirmation {
    /// Booking ID
    pub booking_id: BookingId,
    /// Who booked
    pub user_id: UserId,
    /// What was booked
    pub event_id: EventId,
}

impl From<&Booking> for BookingConfirmation {
    fn from(booking: &Booking) -> Self {
        Self {
            booking_id: booking.id,
            user_id: booking.user_id,
            event_id: booking.event_id,
        }
    }
}

/// One audit row appended per confirmation message observed.
///
/// Duplicates are possible when the bus redelivers a message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationLog {
    /// Sequential row ID
    pub id: i64,
    /// Booking the message referred to
    pub booking_id: BookingId,
    /// User the message referred to
    pub user_id: UserId,
    /// Event the message referred to
    pub event_id: EventId,
    /// Human-readable notification text
    pub message: String,
    /// When the row was appended
    pub created_at: DateTime<Utc>,
}

/// Input for appending a notification log row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewNotificationLog {
    /// Booking the message referred to
    pub booking_id: BookingId,
    /// User the message referred to
    pub user_id: UserId,
    /// Event the message referred to
    pub event_id: EventId,
    /// Human-readable notification text
    pub message: String,
}
