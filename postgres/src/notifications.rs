use crate::{PgStore, store_error};
use boxoffice_core::store::{NotificationLogStore, StoreError, StoreFuture};
use boxoffice_core::types::{BookingId, EventId, NewNotificationLog, NotificationLog, UserId};
use sqlx::Row;
use sqlx::postgres::PgRow;
use uuid::Uuid;

fn log_from_row(row: &PgRow) -> Result<NotificationLog, StoreError> {
    Ok(NotificationLog {
        id: row.try_get("id").map_err(store_error)?,
        booking_id: BookingId::from_uuid(row.try_get::<Uuid, _>("booking_id").map_err(store_error)?),
        user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id").map_err(store_error)?),
        event_id: EventId::from_uuid(row.try_get::<Uuid, _>("event_id").map_err(store_error)?),
        message: row.try_get("message").map_err(store_error)?,
        created_at: row.try_get("created_at").map_err(store_error)?,
    })
}

impl NotificationLogStore for PgStore {
    fn append(&self, entry: NewNotificationLog) -> StoreFuture<'_, NotificationLog> {
        Box::pin(async move {
            let row = sqlx::query(
                r"
                INSERT INTO notification_logs (booking_id, user_id, event_id, message)
                VALUES ($1, $2, $3, $4)
                RETURNING id, booking_id, user_id, event_id, message, created_at
                ",
            )
            .bind(*entry.booking_id.as_uuid())
            .bind(*entry.user_id.as_uuid())
            .bind(*entry.event_id.as_uuid())
            .bind(&entry.message)
            .fetch_one(&self.pool)
            .await
            .map_err(store_error)?;

            log_from_row(&row)
        })
    }

    fn latest(&self, limit: i64) -> StoreFuture<'_, Vec<NotificationLog>> {
        Box::pin(async move {
            let rows = sqlx::query(
                r"
                SELECT id, booking_id, user_id, event_id, message, created_at
                FROM notification_logs
                ORDER BY id DESC
                LIMIT $1
                ",
            )
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(store_error)?;

            rows.iter().map(log_from_row).collect()
        })
    }
}
