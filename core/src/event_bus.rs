//! Message bus abstraction for booking notifications.
//!
//! This module provides the [`EventBus`] trait for publishing and subscribing to
//! messages. The relational store stays the source of truth; the bus only carries
//! notice of what already happened.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐
//! │ Booking request  │
//! └────────┬─────────┘
//!          │
//!          ▼
//! ┌──────────────────┐
//! │ 1. Commit booking│
//! │   to Postgres    │◄─── Source of truth
//! └────────┬─────────┘
//!          │
//!          ▼
//! ┌──────────────────┐
//! │ 2. Publish to    │
//! │    Event Bus     │◄─── Best effort, never rolls back step 1
//! └────────┬─────────┘
//!          │
//!          ▼
//! ┌──────────────────┐
//! │ Notification     │
//! │ consumer         │
//! └──────────────────┘
//! ```
//!
//! # Delivery
//!
//! - **Publish is fire-and-forget** from the caller's point of view: a failed or
//!   lost publish leaves the booking committed.
//! - **Subscriptions may redeliver**: consumers can see the same message twice.
//!
//! # Implementations
//!
//! - `InMemoryEventBus` (`boxoffice-testing`) - for tests
//! - `RedpandaEventBus` (`boxoffice-redpanda`) - for production (Kafka-compatible)
//!
//! # Example
//!
//! ```rust,ignore
//! use boxoffice_core::event_bus::{BusMessage, EventBus};
//! use futures::StreamExt;
//!
//! async fn example(event_bus: impl EventBus) {
//!     let message = BusMessage::new(b"{}".to_vec()).with_key("booking-1");
//!     event_bus.publish("booking.confirmed", &message).await?;
//!
//!     let mut stream = event_bus.subscribe(&["booking.confirmed"]).await?;
//!     while let Some(result) = stream.next().await {
//!         match result {
//!             Ok(message) => println!("Received {} bytes", message.payload.len()),
//!             Err(e) => eprintln!("Error: {}", e),
//!         }
//!     }
//! }
//! ```

use futures::Stream;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Errors that can occur during event bus operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EventBusError {
    /// Failed to connect to the event bus
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Failed to publish a message to a topic
    #[error("Publish failed for topic '{topic}': {reason}")]
    PublishFailed {
        /// The topic that failed
        topic: String,
        /// The reason for failure
        reason: String,
    },

    /// Failed to subscribe to topics
    #[error("Subscription failed for topics {topics:?}: {reason}")]
    SubscriptionFailed {
        /// The topics that failed to subscribe
        topics: Vec<String>,
        /// The reason for failure
        reason: String,
    },

    /// A received message could not be read
    #[error("Deserialization failed: {0}")]
    DeserializationFailed(String),

    /// Network or transport error
    #[error("Transport error: {0}")]
    TransportError(String),
}

/// A message as carried by the bus: opaque payload plus optional partition key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BusMessage {
    /// Partition key (messages with the same key keep their relative order)
    pub key: Option<String>,
    /// Encoded body
    pub payload: Vec<u8>,
}

impl BusMessage {
    /// Create a message without a key.
    #[must_use]
    pub const fn new(payload: Vec<u8>) -> Self {
        Self { key: None, payload }
    }

    /// Attach a partition key.
    #[must_use]
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }
}

/// Stream of messages from a subscription.
///
/// Each item is a `Result`: transport or decoding problems surface as `Err`
/// items and the stream keeps going.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<BusMessage, EventBusError>> + Send>>;

/// Trait for event bus implementations.
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync`; the admission controller publishes
/// from many request tasks at once.
///
/// # Dyn Compatibility
///
/// This trait uses explicit `Pin<Box<dyn Future>>` returns instead of `async fn`
/// to enable trait object usage (`Arc<dyn EventBus>`).
pub trait EventBus: Send + Sync {
    /// Publish a message to a topic.
    ///
    /// # Errors
    ///
    /// Returns [`EventBusError::PublishFailed`] if the publish operation fails.
    fn publish(
        &self,
        topic: &str,
        message: &BusMessage,
    ) -> Pin<Box<dyn Future<Output = Result<(), EventBusError>> + Send + '_>>;

    /// Subscribe to one or more topics and receive a stream of messages.
    ///
    /// # Errors
    ///
    /// Returns [`EventBusError::SubscriptionFailed`] if subscription fails.
    ///
    /// # Consumer Groups
    ///
    /// Implementations backed by a durable log use consumer groups so several
    /// service instances share the work and resume where the group left off.
    fn subscribe(
        &self,
        topics: &[&str],
    ) -> Pin<Box<dyn Future<Output = Result<EventStream, EventBusError>> + Send + '_>>;
}
