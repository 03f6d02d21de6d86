//! Business errors shared by the runtime and web crates.

use crate::store::StoreError;
use thiserror::Error;

/// Which referenced entity was missing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotFound {
    /// No user with this id.
    #[error("user {0} not found")]
    User(String),

    /// No event with this id.
    #[error("event {0} not found")]
    Event(String),
}

/// Outcome of a rejected admission request.
///
/// The booking transaction is always rolled back before one of these is returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BookingError {
    /// Unknown user or event.
    #[error(transparent)]
    NotFound(#[from] NotFound),

    /// The event has no seat left.
    #[error("event {event_id} is sold out")]
    SoldOut {
        /// The event that was full
        event_id: String,
    },

    /// Store failure or any other unexpected condition.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for BookingError {
    fn from(err: StoreError) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Request input failed validation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct ValidationError(pub String);

impl ValidationError {
    /// Create a validation error with a message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}
