//! Router for the booking service.

use crate::handlers::{bookings, events, health, metrics, notifications, users};
use crate::middleware::correlation_id_layer;
use crate::state::AppState;
use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

/// Build the complete router.
///
/// `GET /metrics` is only mounted when the state carries a Prometheus handle.
pub fn build_router(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/health", get(health::health_check))
        .route("/bookings", post(bookings::create_booking))
        .route(
            "/events",
            post(events::create_event).get(events::list_events),
        )
        .route(
            "/events/:id",
            get(events::get_event).patch(events::update_event),
        )
        .route("/users", post(users::create_user).get(users::list_users))
        .route("/users/:id", get(users::get_user))
        .route("/notifications", get(notifications::list_notifications));

    if state.metrics.is_some() {
        router = router.route("/metrics", get(metrics::render_metrics));
    }

    router
        .layer(TraceLayer::new_for_http())
        .layer(correlation_id_layer())
        .with_state(state)
}
