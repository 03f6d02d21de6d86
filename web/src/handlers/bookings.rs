//! Booking endpoint.
//!
//! - POST /bookings - Take one seat of an event for a user

use super::non_blank;
use crate::error::AppError;
use crate::extractors::{CorrelationId, Json};
use crate::state::AppState;
use axum::{extract::State, http::StatusCode};
use boxoffice_core::error::ValidationError;
use boxoffice_core::types::BookingConfirmation;
use serde::Deserialize;
use serde_json::Value;

/// Request to book a seat.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    /// Booking user
    pub user_id: Option<Value>,
    /// Event to take a seat of
    pub event_id: Option<Value>,
}

/// Read an id field leniently.
///
/// Null and blank strings count as missing. Any other JSON value is passed on
/// as text, so a number or object reaches the lookup and ends up unknown.
fn id_field(value: Option<Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(s) => non_blank(Some(s)),
        other => Some(other.to_string()),
    }
}

/// Book one seat.
///
/// ```bash
/// curl -X POST http://localhost:3000/bookings \
///   -H "Content-Type: application/json" \
///   -d '{"userId": "...", "eventId": "..."}'
/// ```
///
/// 201 with `{bookingId, userId, eventId}`; 400 when a field is missing; 404
/// for an unknown user or event; 409 when the event is sold out.
///
/// # Errors
///
/// See above; store failures are 500.
pub async fn create_booking(
    State(state): State<AppState>,
    CorrelationId(correlation_id): CorrelationId,
    Json(request): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<BookingConfirmation>), AppError> {
    let (Some(user_id), Some(event_id)) = (id_field(request.user_id), id_field(request.event_id))
    else {
        return Err(ValidationError::new("userId and eventId are required").into());
    };

    let confirmation = state.admission.book(&user_id, &event_id).await?;
    tracing::info!(
        %correlation_id,
        booking_id = %confirmation.booking_id,
        event_id = %confirmation.event_id,
        "Booking accepted"
    );
    Ok((StatusCode::CREATED, Json(confirmation)))
}
