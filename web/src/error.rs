//! Error type for web handlers.
//!
//! [`AppError`] maps domain errors onto HTTP responses with a JSON body of
//! `{"code": ..., "message": ...}`:
//!
//! | Domain error | Status | Code |
//! |---|---|---|
//! | validation, malformed body or query | 400 | `BAD_REQUEST` |
//! | unknown user or event | 404 | `NOT_FOUND` |
//! | event sold out | 409 | `SOLD_OUT` |
//! | duplicate email | 409 | `CONFLICT` |
//! | anything else | 500 | `INTERNAL_SERVER_ERROR` |

use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use boxoffice_core::error::{BookingError, NotFound, ValidationError};
use boxoffice_core::store::StoreError;
use boxoffice_runtime::CatalogError;
use serde::Serialize;
use std::fmt;

/// Application error type for web handlers.
///
/// The `source` is logged for server errors and never sent to the client.
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
    code: String,
    source: Option<anyhow::Error>,
}

impl AppError {
    /// Create a new application error.
    #[must_use]
    pub const fn new(status: StatusCode, message: String, code: String) -> Self {
        Self {
            status,
            message,
            code,
            source: None,
        }
    }

    /// Attach the underlying error for logging.
    #[must_use]
    pub fn with_source(mut self, source: anyhow::Error) -> Self {
        self.source = Some(source);
        self
    }

    /// HTTP status of the response.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Machine-readable error code.
    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    /// 400 Bad Request.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            message.into(),
            "BAD_REQUEST".to_string(),
        )
    }

    /// 404 Not Found.
    #[must_use]
    pub fn not_found(resource: impl fmt::Display, id: impl fmt::Display) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            format!("{resource} with id {id} not found"),
            "NOT_FOUND".to_string(),
        )
    }

    /// 409 Conflict.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message.into(), "CONFLICT".to_string())
    }

    /// 409 Conflict for an event with no seat left.
    #[must_use]
    pub fn sold_out(event_id: impl fmt::Display) -> Self {
        Self::new(
            StatusCode::CONFLICT,
            format!("Event {event_id} is sold out"),
            "SOLD_OUT".to_string(),
        )
    }

    /// 500 Internal Server Error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            message.into(),
            "INTERNAL_SERVER_ERROR".to_string(),
        )
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            match &self.source {
                Some(source) => tracing::error!(
                    status = %self.status,
                    code = %self.code,
                    message = %self.message,
                    error = %source,
                    "Internal server error"
                ),
                None => tracing::error!(
                    status = %self.status,
                    code = %self.code,
                    message = %self.message,
                    "Internal server error"
                ),
            }
        }

        let body = ErrorResponse {
            code: self.code,
            message: self.message,
        };

        (self.status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal("An internal error occurred").with_source(err)
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        Self::bad_request(err.0)
    }
}

impl From<NotFound> for AppError {
    fn from(err: NotFound) -> Self {
        match err {
            NotFound::User(id) => Self::not_found("User", id),
            NotFound::Event(id) => Self::not_found("Event", id),
        }
    }
}

impl From<BookingError> for AppError {
    fn from(err: BookingError) -> Self {
        match err {
            BookingError::NotFound(not_found) => not_found.into(),
            BookingError::SoldOut { event_id } => Self::sold_out(event_id),
            BookingError::Internal(reason) => anyhow::anyhow!(reason).into(),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UniqueViolation(_) => Self::conflict("Email already exists"),
            other => anyhow::Error::new(other).into(),
        }
    }
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::NotFound(not_found) => not_found.into(),
            CatalogError::Store(store) => store.into(),
            CatalogError::Invalidation(cache) => {
                Self::internal("Event updated but the cached copy could not be invalidated")
                    .with_source(anyhow::Error::new(cache))
            }
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}
