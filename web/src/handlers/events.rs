//! Event endpoints.
//!
//! - POST /events - Create an event
//! - GET /events - List events with filters and pagination
//! - GET /events/:id - Read one event through the cache
//! - PATCH /events/:id - Update title or date and invalidate the cached copy

use super::non_blank;
use crate::dates::{parse_datetime, serialize_millis, serialize_opt_millis};
use crate::error::AppError;
use crate::extractors::{Json, Query};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
};
use boxoffice_core::error::ValidationError;
use boxoffice_core::types::{Event, EventFilter, EventId, EventUpdate, NewEvent, Page};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request to create an event.
#[derive(Debug, Deserialize)]
pub struct CreateEventRequest {
    /// Event title
    pub title: Option<String>,
    /// Capacity; must be a positive integer
    pub seats: Option<serde_json::Value>,
    /// Event date
    pub date: Option<String>,
}

impl CreateEventRequest {
    /// Check the fields and build the insert.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] for a missing title or date, a seat count
    /// that is not a positive `i32`, or an unparsable date.
    pub fn validate(self) -> Result<NewEvent, ValidationError> {
        let title = non_blank(self.title);
        let seats = self.seats.as_ref().and_then(seat_count);

        let (Some(title), Some(seats), Some(date)) = (title, seats, non_blank(self.date)) else {
            return Err(ValidationError::new("title, seats (integer > 0) and date are required"));
        };
        let event_date = parse_datetime(&date).ok_or_else(|| ValidationError::new("invalid date"))?;

        Ok(NewEvent {
            title,
            seats,
            event_date,
        })
    }
}

/// A positive whole number that fits in `i32`; `3.0` counts, `3.5` and `"3"` do not.
#[allow(clippy::cast_possible_truncation)]
fn seat_count(value: &serde_json::Value) -> Option<i32> {
    if let Some(n) = value.as_i64() {
        return i32::try_from(n).ok().filter(|n| *n > 0);
    }
    let f = value.as_f64().filter(|f| f.fract() == 0.0)?;
    if f < 1.0 || f > f64::from(i32::MAX) {
        return None;
    }
    Some(f as i32)
}

/// Query parameters for listing events.
///
/// Kept as strings so unusable `limit`/`offset` values fall back to defaults
/// instead of rejecting the request.
#[derive(Debug, Default, Deserialize)]
pub struct ListEventsQuery {
    /// Page size (default 20, max 100)
    pub limit: Option<String>,
    /// Rows to skip
    pub offset: Option<String>,
    /// Title substring
    pub q: Option<String>,
    /// Earliest event date
    pub from: Option<String>,
    /// Latest event date
    pub to: Option<String>,
}

impl ListEventsQuery {
    /// Build the store filter.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] if `from` or `to` is not a date.
    pub fn into_filter(self) -> Result<EventFilter, ValidationError> {
        Ok(EventFilter {
            q: non_blank(self.q).map(|q| q.trim().to_string()),
            from: bound(self.from, "from")?,
            to: bound(self.to, "to")?,
            limit: Page::<Event>::clamp_limit(self.limit.as_deref()),
            offset: Page::<Event>::clamp_offset(self.offset.as_deref()),
        })
    }
}

fn bound(raw: Option<String>, name: &str) -> Result<Option<DateTime<Utc>>, ValidationError> {
    non_blank(raw)
        .map(|raw| parse_datetime(&raw).ok_or_else(|| ValidationError::new(format!("invalid {name} date"))))
        .transpose()
}

/// Event as rendered in responses.
///
/// Dates are written with millisecond precision. `created_at` only appears in
/// listings.
#[derive(Debug, Serialize)]
pub struct EventBody {
    /// Event ID
    pub id: EventId,
    /// Event title
    pub title: String,
    /// Capacity
    pub total_seats: i32,
    /// Seats not yet booked
    pub available_seats: i32,
    /// When the event takes place
    #[serde(serialize_with = "serialize_millis")]
    pub event_date: DateTime<Utc>,
    /// Creation timestamp, listings only
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_opt_millis"
    )]
    pub created_at: Option<DateTime<Utc>>,
}

impl EventBody {
    /// Body for `POST /events` and `GET /events/:id`.
    #[must_use]
    pub fn details(event: Event) -> Self {
        Self {
            created_at: None,
            ..Self::listed(event)
        }
    }

    /// Body for one item of `GET /events`.
    #[must_use]
    pub fn listed(event: Event) -> Self {
        Self {
            id: event.id,
            title: event.title,
            total_seats: event.total_seats,
            available_seats: event.available_seats,
            event_date: event.event_date,
            created_at: Some(event.created_at),
        }
    }
}

/// An event read plus where it came from.
#[derive(Debug, Serialize)]
pub struct EventResponse {
    /// Event fields
    #[serde(flatten)]
    pub event: EventBody,
    /// `true` when served from the cache
    pub cached: bool,
}

/// Request to update event metadata.
#[derive(Debug, Deserialize)]
pub struct UpdateEventRequest {
    /// New title
    pub title: Option<String>,
    /// New date
    pub date: Option<String>,
}

impl UpdateEventRequest {
    /// Check the fields and build the update.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] if neither field is set or the date is invalid.
    pub fn validate(self) -> Result<EventUpdate, ValidationError> {
        let update = EventUpdate {
            title: non_blank(self.title),
            event_date: non_blank(self.date)
                .map(|raw| parse_datetime(&raw).ok_or_else(|| ValidationError::new("invalid date")))
                .transpose()?,
        };
        if update.is_empty() {
            return Err(ValidationError::new("title or date required"));
        }
        Ok(update)
    }
}

/// Result of a metadata update.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEventResponse {
    /// Always `true`
    pub ok: bool,
    /// Always `true`; a failed invalidation is an error instead
    pub cache_invalidated: bool,
}

// ============================================================================
// Handlers
// ============================================================================

/// Create an event. Both seat counters start at `seats`.
///
/// ```bash
/// curl -X POST http://localhost:3000/events \
///   -H "Content-Type: application/json" \
///   -d '{"title": "Jazz Night", "seats": 120, "date": "2025-06-01T20:00:00Z"}'
/// ```
///
/// # Errors
///
/// 400 for invalid input, 500 for store failures.
pub async fn create_event(
    State(state): State<AppState>,
    Json(request): Json<CreateEventRequest>,
) -> Result<(StatusCode, Json<EventBody>), AppError> {
    let event = state.events.create_event(request.validate()?).await?;
    tracing::info!(event_id = %event.id, seats = event.total_seats, "Event created");
    Ok((StatusCode::CREATED, Json(EventBody::details(event))))
}

/// List events ordered by date.
///
/// ```bash
/// curl "http://localhost:3000/events?q=jazz&from=2025-06-01&limit=10"
/// ```
///
/// # Errors
///
/// 400 for an unparsable `from`/`to`, 500 for store failures.
pub async fn list_events(
    State(state): State<AppState>,
    Query(query): Query<ListEventsQuery>,
) -> Result<Json<Page<EventBody>>, AppError> {
    let page = state.events.list_events(query.into_filter()?).await?;
    Ok(Json(Page {
        items: page.items.into_iter().map(EventBody::listed).collect(),
        limit: page.limit,
        offset: page.offset,
    }))
}

/// Read one event, preferring the cache.
///
/// # Errors
///
/// 404 for an unknown event, 500 for store failures.
pub async fn get_event(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
) -> Result<Json<EventResponse>, AppError> {
    let read = state.catalog.get(&event_id).await?;
    Ok(Json(EventResponse {
        event: EventBody::details(read.event),
        cached: read.cached,
    }))
}

/// Update title and/or date, then drop the cached copy.
///
/// # Errors
///
/// 400 for invalid input, 404 for an unknown event, 500 if the store fails
/// or the cached copy could not be dropped.
pub async fn update_event(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
    Json(request): Json<UpdateEventRequest>,
) -> Result<Json<UpdateEventResponse>, AppError> {
    state.catalog.update(&event_id, request.validate()?).await?;
    Ok(Json(UpdateEventResponse {
        ok: true,
        cache_invalidated: true,
    }))
}
