//! HTTP surface of the boxoffice booking service.
//!
//! | Method | Path | Handler |
//! |---|---|---|
//! | POST | `/bookings` | [`handlers::bookings::create_booking`] |
//! | POST | `/events` | [`handlers::events::create_event`] |
//! | GET | `/events` | [`handlers::events::list_events`] |
//! | GET | `/events/:id` | [`handlers::events::get_event`] |
//! | PATCH | `/events/:id` | [`handlers::events::update_event`] |
//! | POST | `/users` | [`handlers::users::create_user`] |
//! | GET | `/users` | [`handlers::users::list_users`] |
//! | GET | `/users/:id` | [`handlers::users::get_user`] |
//! | GET | `/notifications` | [`handlers::notifications::list_notifications`] |
//! | GET | `/health` | [`handlers::health::health_check`] |
//! | GET | `/metrics` | [`handlers::metrics::render_metrics`] |
//!
//! Handlers stay thin: they validate input, call the runtime or a repository,
//! and let [`AppError`] pick the status code.
//!
//! # Example
//!
//! ```ignore
//! use boxoffice_web::{AppState, build_router};
//!
//! let state = AppState::new(admission, catalog, users, events, notifications);
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//! axum::serve(listener, build_router(state)).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod dates;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;

pub use error::AppError;
pub use extractors::{CorrelationId, Json, Query};
pub use middleware::{CORRELATION_ID_HEADER, correlation_id_layer};
pub use routes::build_router;
pub use state::AppState;

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;
