//! Notification consumer with automatic reconnection.
//!
//! Turns `booking.confirmed` messages into notification log rows. The consumer
//! is a long-running background task:
//!
//! ```text
//! loop {
//!     subscribe ──(error)──► wait reconnect_delay, retry
//!     for each message:
//!         decode ──(malformed)──► log, skip
//!         append log ──(store error)──► policy: skip, or retry with backoff
//!     stream ended ──► wait reconnect_delay, resubscribe
//! }
//! ```
//!
//! A failure on one message never stops the loop. The bus may redeliver, and
//! nothing deduplicates, so a redelivered message appends a second row.
//!
//! # Example
//!
//! ```rust,ignore
//! let (shutdown_tx, shutdown_rx) = tokio::sync::broadcast::channel(1);
//! let handle = NotificationConsumer::new(event_bus, log_store, shutdown_rx)
//!     .with_failure_policy(FailurePolicy::Retry(RetryPolicy::default()))
//!     .spawn();
//!
//! // Later
//! let _ = shutdown_tx.send(());
//! handle.await?;
//! ```

use crate::metrics::NotificationMetrics;
use crate::retry::{RetryPolicy, retry_with_backoff};
use boxoffice_core::event_bus::{BusMessage, EventBus, EventStream};
use boxoffice_core::message::{BOOKING_CONFIRMED_TOPIC, BookingConfirmed};
use boxoffice_core::store::{NotificationLogStore, StoreError};
use boxoffice_core::types::NewNotificationLog;
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

/// What to do when appending a log row fails.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum FailurePolicy {
    /// Log the failure and move on to the next message.
    #[default]
    Skip,
    /// Retry store failures with exponential backoff, then log and move on.
    Retry(RetryPolicy),
}

/// Why a message produced no log row.
#[derive(Debug, thiserror::Error)]
enum HandleError {
    #[error("malformed payload: {0}")]
    Malformed(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Background consumer of booking confirmations.
pub struct NotificationConsumer {
    event_bus: Arc<dyn EventBus>,
    log_store: Arc<dyn NotificationLogStore>,
    shutdown: broadcast::Receiver<()>,
    topic: String,
    reconnect_delay: Duration,
    failure_policy: FailurePolicy,
}

impl NotificationConsumer {
    /// Default wait before resubscribing.
    pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(5);

    /// Create a consumer of `booking.confirmed` with the skip policy.
    #[must_use]
    pub fn new(
        event_bus: Arc<dyn EventBus>,
        log_store: Arc<dyn NotificationLogStore>,
        shutdown: broadcast::Receiver<()>,
    ) -> Self {
        Self {
            event_bus,
            log_store,
            shutdown,
            topic: BOOKING_CONFIRMED_TOPIC.to_string(),
            reconnect_delay: Self::DEFAULT_RECONNECT_DELAY,
            failure_policy: FailurePolicy::Skip,
        }
    }

    /// Consume a different topic.
    #[must_use]
    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = topic.into();
        self
    }

    /// Set the wait before resubscribing after a failure or stream end.
    #[must_use]
    pub const fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Set the per-message failure policy.
    #[must_use]
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Run the consumer as a background task until shutdown is signalled.
    #[must_use]
    pub fn spawn(mut self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    /// Run the subscribe-process-reconnect loop until shutdown is signalled.
    pub async fn run(&mut self) {
        info!(topic = %self.topic, "Notification consumer started");

        loop {
            let subscribed = tokio::select! {
                _ = self.shutdown.recv() => break,
                result = self.event_bus.subscribe(&[self.topic.as_str()]) => result,
            };

            match subscribed {
                Ok(mut stream) => {
                    info!(topic = %self.topic, "Subscribed to booking confirmations");
                    if self.process_stream(&mut stream).await.is_break() {
                        break;
                    }
                    warn!(
                        topic = %self.topic,
                        delay_ms = millis(self.reconnect_delay),
                        "Confirmation stream ended, reconnecting"
                    );
                }
                Err(e) => {
                    error!(
                        topic = %self.topic,
                        error = %e,
                        delay_ms = millis(self.reconnect_delay),
                        "Failed to subscribe, retrying"
                    );
                }
            }

            tokio::select! {
                _ = self.shutdown.recv() => break,
                () = tokio::time::sleep(self.reconnect_delay) => {}
            }
        }

        info!(topic = %self.topic, "Notification consumer stopped");
    }

    /// Drain the stream; `Break` means shutdown was requested.
    async fn process_stream(&mut self, stream: &mut EventStream) -> std::ops::ControlFlow<()> {
        loop {
            let next = tokio::select! {
                _ = self.shutdown.recv() => return std::ops::ControlFlow::Break(()),
                next = stream.next() => next,
            };

            match next {
                Some(Ok(message)) => self.handle_message(&message).await,
                Some(Err(e)) => error!(topic = %self.topic, error = %e, "Error receiving message"),
                None => return std::ops::ControlFlow::Continue(()),
            }
        }
    }

    /// Process one message. Never fails: every error is logged and counted.
    pub async fn handle_message(&self, message: &BusMessage) {
        match self.try_handle(message).await {
            Ok(()) => NotificationMetrics::record_logged(),
            Err(HandleError::Malformed(reason)) => {
                NotificationMetrics::record_failure("malformed");
                error!(key = ?message.key, error = %reason, "Skipping malformed confirmation");
            }
            Err(HandleError::Store(e)) => {
                NotificationMetrics::record_failure("store");
                error!(key = ?message.key, error = %e, "Failed to record notification");
            }
        }
    }

    async fn try_handle(&self, message: &BusMessage) -> Result<(), HandleError> {
        let confirmed = BookingConfirmed::from_payload(&message.payload)
            .map_err(|e| HandleError::Malformed(e.to_string()))?;
        let entry = NewNotificationLog {
            booking_id: confirmed.booking_id,
            user_id: confirmed.user_id,
            event_id: confirmed.event_id,
            message: confirmed.notification_text(),
        };

        let row = match &self.failure_policy {
            FailurePolicy::Skip => self.log_store.append(entry).await?,
            FailurePolicy::Retry(policy) => {
                let log_store = Arc::clone(&self.log_store);
                retry_with_backoff(policy, || {
                    let log_store = Arc::clone(&log_store);
                    let entry = entry.clone();
                    async move { log_store.append(entry).await }
                })
                .await?
            }
        };

        debug!(
            log_id = row.id,
            booking_id = %row.booking_id,
            "Notification recorded"
        );
        Ok(())
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
