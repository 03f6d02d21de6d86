//! Prometheus metrics for the booking service.
//!
//! [`install_recorder`] installs the global Prometheus recorder once at startup
//! and returns the handle the web layer renders at `GET /metrics`.
//!
//! # Example
//!
//! ```rust,no_run
//! use boxoffice_runtime::metrics::install_recorder;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let handle = install_recorder()?;
//! println!("{}", handle.render());
//! # Ok(())
//! # }
//! ```

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle, PrometheusRecorder};
use std::time::Duration;
use thiserror::Error;

/// Errors from metrics setup.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to configure the exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// A global recorder is already installed
    #[error("Failed to install metrics recorder: {0}")]
    Install(String),
}

const DURATION_BUCKETS: &[f64] = &[
    0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

fn builder() -> Result<PrometheusBuilder, MetricsError> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Suffix("duration_seconds".to_string()),
            DURATION_BUCKETS,
        )
        .map_err(|e| MetricsError::Build(e.to_string()))
}

/// Build a Prometheus recorder without installing it globally.
///
/// # Errors
///
/// Returns [`MetricsError::Build`] if the bucket configuration is rejected.
pub fn build_recorder() -> Result<PrometheusRecorder, MetricsError> {
    Ok(builder()?.build_recorder())
}

/// Install the global Prometheus recorder and describe every metric.
///
/// Call once per process.
///
/// # Errors
///
/// Returns [`MetricsError`] if the exporter cannot be built or a recorder is
/// already installed.
pub fn install_recorder() -> Result<PrometheusHandle, MetricsError> {
    let handle = builder()?
        .install_recorder()
        .map_err(|e| MetricsError::Install(e.to_string()))?;
    describe_metrics();
    tracing::info!("Prometheus metrics recorder installed");
    Ok(handle)
}

fn describe_metrics() {
    describe_counter!(
        "bookings_total",
        "Admission decisions, labelled by outcome (accepted, sold_out, not_found, error)"
    );
    describe_histogram!(
        "booking_transaction_duration_seconds",
        "Time from transaction begin to commit or rollback"
    );
    describe_counter!(
        "booking_publish_failures_total",
        "Confirmation messages that could not be published after commit"
    );
    describe_counter!(
        "notifications_logged_total",
        "Notification log rows appended by the consumer"
    );
    describe_counter!(
        "notification_failures_total",
        "Confirmation messages the consumer dropped, labelled by reason"
    );
    describe_counter!("cache_hits_total", "Event reads served from the cache");
    describe_counter!("cache_misses_total", "Event reads that went to the store");
    describe_counter!("cache_errors_total", "Cache operations that failed");
    describe_counter!("retry_attempts_total", "Retries scheduled after a failure");
    describe_counter!("retry_successes_total", "Operations that succeeded after retrying");
    describe_counter!("retry_exhausted_total", "Operations that failed after every retry");
    describe_counter!("store_errors_total", "Relational store errors, labelled by kind");
}

/// Outcome label for `bookings_total`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingOutcome {
    /// Seat taken and booking committed
    Accepted,
    /// No seat left
    SoldOut,
    /// Unknown user or event
    NotFound,
    /// Store or other internal failure
    Error,
}

impl BookingOutcome {
    /// Label value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::SoldOut => "sold_out",
            Self::NotFound => "not_found",
            Self::Error => "error",
        }
    }
}

/// Admission controller metrics.
pub struct BookingMetrics;

impl BookingMetrics {
    /// Record one admission decision and how long its transaction was open.
    pub fn record(outcome: BookingOutcome, duration: Duration) {
        counter!("bookings_total", "outcome" => outcome.as_str()).increment(1);
        histogram!("booking_transaction_duration_seconds").record(duration.as_secs_f64());
    }

    /// Record a confirmation that could not be published.
    pub fn record_publish_failure() {
        counter!("booking_publish_failures_total").increment(1);
    }
}

/// Notification consumer metrics.
pub struct NotificationMetrics;

impl NotificationMetrics {
    /// Record an appended log row.
    pub fn record_logged() {
        counter!("notifications_logged_total").increment(1);
    }

    /// Record a dropped message (`malformed` or `store`).
    pub fn record_failure(reason: &'static str) {
        counter!("notification_failures_total", "reason" => reason).increment(1);
    }
}

/// Event cache metrics.
pub struct CacheMetrics;

impl CacheMetrics {
    /// Record a cache hit.
    pub fn record_hit() {
        counter!("cache_hits_total").increment(1);
    }

    /// Record a cache miss.
    pub fn record_miss() {
        counter!("cache_misses_total").increment(1);
    }

    /// Record a failed cache operation (`get`, `set` or `delete`).
    pub fn record_error(operation: &'static str) {
        counter!("cache_errors_total", "operation" => operation).increment(1);
    }
}
