//! HTTP handlers, one module per resource.

pub mod bookings;
pub mod events;
pub mod health;
pub mod metrics;
pub mod notifications;
pub mod users;

/// Treat absent, empty and whitespace-only strings alike.
fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
