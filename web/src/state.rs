//! Application state shared by every handler.

use boxoffice_core::store::{EventRepository, NotificationLogStore, UserRepository};
use boxoffice_runtime::{AdmissionController, EventCatalog};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

/// Handles to the booking core and the repositories behind the plain
/// CRUD endpoints.
///
/// Cloned per request by axum; every field is shared.
#[derive(Clone)]
pub struct AppState {
    /// Seat admission
    pub admission: AdmissionController,
    /// Cached event reads and metadata updates
    pub catalog: EventCatalog,
    /// User records
    pub users: Arc<dyn UserRepository>,
    /// Event creation and listing
    pub events: Arc<dyn EventRepository>,
    /// Notification log reads
    pub notifications: Arc<dyn NotificationLogStore>,
    /// Renders `GET /metrics`; `None` disables the route
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Create state without a metrics endpoint.
    #[must_use]
    pub fn new(
        admission: AdmissionController,
        catalog: EventCatalog,
        users: Arc<dyn UserRepository>,
        events: Arc<dyn EventRepository>,
        notifications: Arc<dyn NotificationLogStore>,
    ) -> Self {
        Self {
            admission,
            catalog,
            users,
            events,
            notifications,
            metrics: None,
        }
    }

    /// Expose Prometheus metrics at `GET /metrics`.
    #[must_use]
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}
