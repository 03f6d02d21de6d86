//! Notification log endpoint.

use crate::error::AppError;
use crate::extractors::Json;
use crate::state::AppState;
use axum::extract::State;
use boxoffice_core::types::NotificationLog;

/// Rows returned by `GET /notifications`.
pub const LATEST_NOTIFICATIONS: i64 = 50;

/// The 50 most recent notification log rows, newest first.
///
/// # Errors
///
/// 500 for store failures.
pub async fn list_notifications(
    State(state): State<AppState>,
) -> Result<Json<Vec<NotificationLog>>, AppError> {
    Ok(Json(state.notifications.latest(LATEST_NOTIFICATIONS).await?))
}
