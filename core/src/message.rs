//! Wire payload published after every committed booking.
//!
//! The payload is UTF-8 JSON so non-Rust consumers can read it:
//!
//! ```json
//! {"bookingId":"…","userId":"…","eventId":"…","ts":"2025-01-01T00:00:00Z"}
//! ```

use crate::types::{Booking, BookingId, EventId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default topic for confirmation messages.
pub const BOOKING_CONFIRMED_TOPIC: &str = "booking.confirmed";

/// Errors encoding or decoding a bus payload.
#[derive(Error, Debug)]
pub enum MessageError {
    /// Payload could not be encoded.
    #[error("Failed to encode message: {0}")]
    Encode(String),

    /// Payload is not valid UTF-8 JSON of the expected shape.
    #[error("Malformed message payload: {0}")]
    Malformed(String),
}

/// `booking.confirmed` message body.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingConfirmed {
    /// Booking ID
    pub booking_id: BookingId,
    /// Who booked
    pub user_id: UserId,
    /// What was booked
    pub event_id: EventId,
    /// When the message was produced
    pub ts: DateTime<Utc>,
}

impl BookingConfirmed {
    /// Build the message for a committed booking.
    #[must_use]
    pub const fn for_booking(booking: &Booking, ts: DateTime<Utc>) -> Self {
        Self {
            booking_id: booking.id,
            user_id: booking.user_id,
            event_id: booking.event_id,
            ts,
        }
    }

    /// Encode as UTF-8 JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns [`MessageError::Encode`] if serialization fails.
    pub fn to_payload(&self) -> Result<Vec<u8>, MessageError> {
        serde_json::to_vec(self).map_err(|e| MessageError::Encode(e.to_string()))
    }

    /// Decode from UTF-8 JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns [`MessageError::Malformed`] for non-UTF-8 input, invalid JSON, or
    /// missing/invalid fields.
    pub fn from_payload(payload: &[u8]) -> Result<Self, MessageError> {
        let text =
            std::str::from_utf8(payload).map_err(|e| MessageError::Malformed(e.to_string()))?;
        serde_json::from_str(text).map_err(|e| MessageError::Malformed(e.to_string()))
    }

    /// Text stored in the notification log for this message.
    #[must_use]
    pub fn notification_text(&self) -> String {
        format!("Booking confirmed: {}", self.booking_id)
    }

    /// Partition key: messages for the same booking land on the same partition.
    #[must_use]
    pub fn key(&self) -> String {
        self.booking_id.to_string()
    }
}
