//! Booking transaction over a pooled `PostgreSQL` connection.

use crate::{PgStore, store_error};
use boxoffice_core::store::{BookingTransaction, RelationalStore, StoreError, StoreFuture};
use boxoffice_core::types::{Booking, EventId, UserId};
use sqlx::{Postgres, Transaction};

impl RelationalStore for PgStore {
    fn begin(&self) -> StoreFuture<'_, Box<dyn BookingTransaction>> {
        Box::pin(async move {
            let tx = self.pool.begin().await.map_err(store_error)?;
            let tx: Box<dyn BookingTransaction> = Box::new(PgBookingTransaction { tx });
            Ok(tx)
        })
    }
}

/// An open `PostgreSQL` transaction.
///
/// The event row lock taken by [`lock_event`](BookingTransaction::lock_event)
/// is a `FOR UPDATE` row lock and is released by `COMMIT` or `ROLLBACK`.
/// Dropping the value without finishing it rolls back when the connection is
/// returned to the pool.
pub struct PgBookingTransaction {
    tx: Transaction<'static, Postgres>,
}

impl BookingTransaction for PgBookingTransaction {
    fn user_exists(&mut self, user_id: UserId) -> StoreFuture<'_, bool> {
        Box::pin(async move {
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
                .bind(*user_id.as_uuid())
                .fetch_one(&mut *self.tx)
                .await
                .map_err(store_error)
        })
    }

    fn lock_event(&mut self, event_id: EventId) -> StoreFuture<'_, Option<i32>> {
        Box::pin(async move {
            sqlx::query_scalar::<_, i32>(
                "SELECT available_seats FROM events WHERE id = $1 FOR UPDATE",
            )
            .bind(*event_id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(store_error)
        })
    }

    fn decrement_seats(&mut self, event_id: EventId) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            let result = sqlx::query(
                "UPDATE events SET available_seats = available_seats - 1 WHERE id = $1",
            )
            .bind(*event_id.as_uuid())
            .execute(&mut *self.tx)
            .await
            .map_err(store_error)?;

            if result.rows_affected() == 1 {
                Ok(())
            } else {
                Err(StoreError::Database(format!(
                    "seat decrement matched {} rows for event {event_id}",
                    result.rows_affected()
                )))
            }
        })
    }

    fn insert_booking(&mut self, booking: &Booking) -> StoreFuture<'_, ()> {
        let booking = booking.clone();
        Box::pin(async move {
            sqlx::query(
                r"
                INSERT INTO bookings (id, user_id, event_id, created_at)
                VALUES ($1, $2, $3, $4)
                ",
            )
            .bind(*booking.id.as_uuid())
            .bind(*booking.user_id.as_uuid())
            .bind(*booking.event_id.as_uuid())
            .bind(booking.created_at)
            .execute(&mut *self.tx)
            .await
            .map_err(store_error)?;
            Ok(())
        })
    }

    fn commit(self: Box<Self>) -> StoreFuture<'static, ()> {
        Box::pin(async move { self.tx.commit().await.map_err(store_error) })
    }

    fn rollback(self: Box<Self>) -> StoreFuture<'static, ()> {
        Box::pin(async move { self.tx.rollback().await.map_err(store_error) })
    }
}
