use crate::{PgStore, store_error};
use boxoffice_core::store::{StoreError, StoreFuture, UserRepository};
use boxoffice_core::types::{NewUser, Page, User, UserId};
use sqlx::Row;
use sqlx::postgres::PgRow;
use uuid::Uuid;

fn user_from_row(row: &PgRow) -> Result<User, StoreError> {
    Ok(User {
        id: UserId::from_uuid(row.try_get::<Uuid, _>("id").map_err(store_error)?),
        name: row.try_get("name").map_err(store_error)?,
        email: row.try_get("email").map_err(store_error)?,
        created_at: row.try_get("created_at").map_err(store_error)?,
    })
}

impl UserRepository for PgStore {
    fn create_user(&self, user: NewUser) -> StoreFuture<'_, User> {
        Box::pin(async move {
            let row = sqlx::query(
                r"
                INSERT INTO users (id, name, email)
                VALUES ($1, $2, $3)
                RETURNING id, name, email, created_at
                ",
            )
            .bind(Uuid::new_v4())
            .bind(&user.name)
            .bind(&user.email)
            .fetch_one(&self.pool)
            .await
            .map_err(store_error)?;

            let created = user_from_row(&row)?;
            tracing::debug!(user_id = %created.id, "User created");
            Ok(created)
        })
    }

    fn get_user(&self, user_id: UserId) -> StoreFuture<'_, Option<User>> {
        Box::pin(async move {
            let row = sqlx::query("SELECT id, name, email, created_at FROM users WHERE id = $1")
                .bind(*user_id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(store_error)?;

            row.as_ref().map(user_from_row).transpose()
        })
    }

    fn list_users(&self, limit: i64, offset: i64) -> StoreFuture<'_, Page<User>> {
        Box::pin(async move {
            let rows = sqlx::query(
                r"
                SELECT id, name, email, created_at
                FROM users
                ORDER BY created_at DESC
                LIMIT $1 OFFSET $2
                ",
            )
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(store_error)?;

            Ok(Page {
                items: rows.iter().map(user_from_row).collect::<Result<_, _>>()?,
                limit,
                offset,
            })
        })
    }
}
