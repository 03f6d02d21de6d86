//! User endpoints.
//!
//! - POST /users - Register a user
//! - GET /users/:id - Read one user
//! - GET /users - List users, newest first

use super::non_blank;
use crate::error::AppError;
use crate::extractors::{Json, Query};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
};
use boxoffice_core::error::{NotFound, ValidationError};
use boxoffice_core::types::{NewUser, Page, User, UserId};
use serde::{Deserialize, Serialize};

/// Request to register a user.
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    /// Display name
    pub name: Option<String>,
    /// Email address, unique across users
    pub email: Option<String>,
}

/// Response after registering a user.
#[derive(Debug, Serialize)]
pub struct CreateUserResponse {
    /// New user ID
    pub id: UserId,
    /// Display name
    pub name: String,
    /// Email address
    pub email: String,
}

/// Pagination parameters.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    /// Page size (default 20, max 100)
    pub limit: Option<String>,
    /// Rows to skip
    pub offset: Option<String>,
}

/// Register a user.
///
/// ```bash
/// curl -X POST http://localhost:3000/users \
///   -H "Content-Type: application/json" \
///   -d '{"name": "Ada", "email": "ada@example.com"}'
/// ```
///
/// # Errors
///
/// 400 when a field is missing, 409 when the email is taken.
pub async fn create_user(
    State(state): State<AppState>,
    Json(request): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<CreateUserResponse>), AppError> {
    let (Some(name), Some(email)) = (non_blank(request.name), non_blank(request.email)) else {
        return Err(ValidationError::new("name and email are required").into());
    };

    let user = state.users.create_user(NewUser { name, email }).await?;
    tracing::info!(user_id = %user.id, "User created");

    Ok((
        StatusCode::CREATED,
        Json(CreateUserResponse {
            id: user.id,
            name: user.name,
            email: user.email,
        }),
    ))
}

/// Read one user.
///
/// # Errors
///
/// 404 when the id is unknown or not a UUID.
pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<User>, AppError> {
    let id: UserId = user_id
        .parse()
        .map_err(|_| NotFound::User(user_id.clone()))?;

    state
        .users
        .get_user(id)
        .await?
        .map(Json)
        .ok_or_else(|| NotFound::User(user_id).into())
}

/// List users, newest first.
///
/// # Errors
///
/// 500 for store failures.
pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Page<User>>, AppError> {
    let limit = Page::<User>::clamp_limit(query.limit.as_deref());
    let offset = Page::<User>::clamp_offset(query.offset.as_deref());
    Ok(Json(state.users.list_users(limit, offset).await?))
}
