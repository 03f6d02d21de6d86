use crate::{PgStore, store_error};
use boxoffice_core::store::{EventRepository, StoreError, StoreFuture};
use boxoffice_core::types::{Event, EventFilter, EventId, EventUpdate, NewEvent, Page};
use sqlx::Row;
use sqlx::postgres::PgRow;
use uuid::Uuid;

const EVENT_COLUMNS: &str = "id, title, total_seats, available_seats, event_date, created_at";

fn event_from_row(row: &PgRow) -> Result<Event, StoreError> {
    Ok(Event {
        id: EventId::from_uuid(row.try_get::<Uuid, _>("id").map_err(store_error)?),
        title: row.try_get("title").map_err(store_error)?,
        total_seats: row.try_get("total_seats").map_err(store_error)?,
        available_seats: row.try_get("available_seats").map_err(store_error)?,
        event_date: row.try_get("event_date").map_err(store_error)?,
        created_at: row.try_get("created_at").map_err(store_error)?,
    })
}

/// `ILIKE` pattern matching `needle` as a literal substring.
fn contains_pattern(needle: &str) -> String {
    let escaped = needle
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

impl EventRepository for PgStore {
    fn create_event(&self, event: NewEvent) -> StoreFuture<'_, Event> {
        Box::pin(async move {
            let query = format!(
                "INSERT INTO events (id, title, total_seats, available_seats, event_date) \
                 VALUES ($1, $2, $3, $3, $4) RETURNING {EVENT_COLUMNS}"
            );
            let row = sqlx::query(&query)
                .bind(Uuid::new_v4())
                .bind(&event.title)
                .bind(event.seats)
                .bind(event.event_date)
                .fetch_one(&self.pool)
                .await
                .map_err(store_error)?;

            let created = event_from_row(&row)?;
            tracing::debug!(event_id = %created.id, seats = created.total_seats, "Event created");
            Ok(created)
        })
    }

    fn get_event(&self, event_id: EventId) -> StoreFuture<'_, Option<Event>> {
        Box::pin(async move {
            let query = format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = $1");
            let row = sqlx::query(&query)
                .bind(*event_id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(store_error)?;

            row.as_ref().map(event_from_row).transpose()
        })
    }

    fn list_events(&self, filter: EventFilter) -> StoreFuture<'_, Page<Event>> {
        Box::pin(async move {
            let query = format!(
                "SELECT {EVENT_COLUMNS} FROM events \
                 WHERE ($1::text IS NULL OR title ILIKE $1) \
                   AND ($2::timestamptz IS NULL OR event_date >= $2) \
                   AND ($3::timestamptz IS NULL OR event_date <= $3) \
                 ORDER BY event_date ASC, created_at ASC \
                 LIMIT $4 OFFSET $5"
            );
            let rows = sqlx::query(&query)
                .bind(filter.q.as_deref().map(contains_pattern))
                .bind(filter.from)
                .bind(filter.to)
                .bind(filter.limit)
                .bind(filter.offset)
                .fetch_all(&self.pool)
                .await
                .map_err(store_error)?;

            Ok(Page {
                items: rows.iter().map(event_from_row).collect::<Result<_, _>>()?,
                limit: filter.limit,
                offset: filter.offset,
            })
        })
    }

    fn update_event(&self, event_id: EventId, update: EventUpdate) -> StoreFuture<'_, bool> {
        Box::pin(async move {
            let result = sqlx::query(
                r"
                UPDATE events
                SET title = COALESCE($2, title),
                    event_date = COALESCE($3, event_date)
                WHERE id = $1
                ",
            )
            .bind(*event_id.as_uuid())
            .bind(update.title)
            .bind(update.event_date)
            .execute(&self.pool)
            .await
            .map_err(store_error)?;

            Ok(result.rows_affected() > 0)
        })
    }
}
