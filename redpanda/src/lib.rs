//! Redpanda event bus for the boxoffice booking service.
//!
//! [`RedpandaEventBus`] implements [`EventBus`] from `boxoffice-core` over the
//! Kafka protocol with rdkafka, so any Kafka-compatible broker works.
//!
//! # Delivery Semantics
//!
//! **At-least-once delivery** with manual offset commits:
//! - An offset is committed only after the message was handed to the subscriber
//! - If the process dies before the commit, the message is redelivered
//! - Ordering holds within a partition; confirmations are keyed by booking id
//!
//! The notification consumer does not deduplicate, so a redelivered
//! confirmation appends a second log row.
//!
//! # Example
//!
//! ```no_run
//! use boxoffice_core::event_bus::{BusMessage, EventBus};
//! use boxoffice_redpanda::RedpandaEventBus;
//! use futures::StreamExt;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let event_bus = RedpandaEventBus::builder()
//!     .brokers("localhost:9092")
//!     .consumer_group("boxoffice-notifications")
//!     .build()?;
//!
//! let message = BusMessage::new(br#"{"bookingId":"..."}"#.to_vec()).with_key("booking-1");
//! event_bus.publish("booking.confirmed", &message).await?;
//!
//! let mut stream = event_bus.subscribe(&["booking.confirmed"]).await?;
//! while let Some(result) = stream.next().await {
//!     match result {
//!         Ok(message) => println!("Received {} bytes", message.payload.len()),
//!         Err(e) => eprintln!("Error: {e}"),
//!     }
//! }
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use boxoffice_core::event_bus::{BusMessage, EventBus, EventBusError, EventStream};
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::message::{BorrowedMessage, Message};
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::util::Timeout;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

const DEFAULT_BUFFER_SIZE: usize = 1000;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_OFFSET_RESET: &str = "earliest";

/// Redpanda-backed [`EventBus`].
///
/// One producer is shared by every publish. Each `subscribe` call creates its
/// own consumer in the configured group, owned by a forwarding task that ends
/// when the returned stream is dropped.
///
/// # Example
///
/// ```no_run
/// use boxoffice_redpanda::RedpandaEventBus;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let event_bus = RedpandaEventBus::builder()
///     .brokers("localhost:9092,localhost:9093")
///     .producer_acks("all")
///     .auto_offset_reset("earliest")
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct RedpandaEventBus {
    producer: FutureProducer,
    brokers: String,
    timeout: Duration,
    consumer_group: Option<String>,
    buffer_size: usize,
    auto_offset_reset: String,
}

impl RedpandaEventBus {
    /// Create an event bus with default settings.
    ///
    /// # Errors
    ///
    /// Returns [`EventBusError::ConnectionFailed`] if the producer cannot be created.
    pub fn new(brokers: &str) -> Result<Self, EventBusError> {
        Self::builder().brokers(brokers).build()
    }

    /// Start configuring an event bus.
    #[must_use]
    pub fn builder() -> RedpandaEventBusBuilder {
        RedpandaEventBusBuilder::default()
    }

    /// Bootstrap servers this bus talks to.
    #[must_use]
    pub fn brokers(&self) -> &str {
        &self.brokers
    }

    /// Consumer group used by `subscribe`.
    #[must_use]
    pub fn consumer_group_for(&self, topics: &[String]) -> String {
        self.consumer_group
            .clone()
            .unwrap_or_else(|| default_group(topics))
    }
}

/// Group id derived from the sorted topic list.
fn default_group(topics: &[String]) -> String {
    let mut sorted = topics.to_vec();
    sorted.sort();
    format!("boxoffice-{}", sorted.join("-"))
}

/// Builder for [`RedpandaEventBus`].
#[derive(Default)]
pub struct RedpandaEventBusBuilder {
    brokers: Option<String>,
    producer_acks: Option<String>,
    compression: Option<String>,
    timeout: Option<Duration>,
    consumer_group: Option<String>,
    buffer_size: Option<usize>,
    auto_offset_reset: Option<String>,
}

impl RedpandaEventBusBuilder {
    /// Comma-separated bootstrap servers (required).
    #[must_use]
    pub fn brokers(mut self, brokers: impl Into<String>) -> Self {
        self.brokers = Some(brokers.into());
        self
    }

    /// Producer acknowledgment mode: `"0"`, `"1"` (default) or `"all"`.
    #[must_use]
    pub fn producer_acks(mut self, acks: impl Into<String>) -> Self {
        self.producer_acks = Some(acks.into());
        self
    }

    /// Compression codec: `"none"` (default), `"gzip"`, `"snappy"`, `"lz4"` or `"zstd"`.
    #[must_use]
    pub fn compression(mut self, compression: impl Into<String>) -> Self {
        self.compression = Some(compression.into());
        self
    }

    /// Producer send timeout. Default: 5 seconds.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Consumer group for subscriptions.
    ///
    /// Instances sharing a group split the topic's partitions between them.
    /// Without one, the group is derived from the subscribed topics.
    #[must_use]
    pub fn consumer_group(mut self, consumer_group: impl Into<String>) -> Self {
        self.consumer_group = Some(consumer_group.into());
        self
    }

    /// Messages buffered between the consumer and the subscriber. Default: 1000.
    #[must_use]
    pub const fn buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = Some(buffer_size);
        self
    }

    /// Where a new consumer group starts reading: `"earliest"` (default),
    /// `"latest"` or `"error"`.
    #[must_use]
    pub fn auto_offset_reset(mut self, policy: impl Into<String>) -> Self {
        self.auto_offset_reset = Some(policy.into());
        self
    }

    /// Build the [`RedpandaEventBus`].
    ///
    /// # Errors
    ///
    /// Returns [`EventBusError::ConnectionFailed`] if the brokers are not set,
    /// the buffer size is zero, or the producer cannot be created.
    pub fn build(self) -> Result<RedpandaEventBus, EventBusError> {
        let brokers = self
            .brokers
            .ok_or_else(|| EventBusError::ConnectionFailed("Brokers not configured".to_string()))?;

        let buffer_size = self.buffer_size.unwrap_or(DEFAULT_BUFFER_SIZE);
        if buffer_size == 0 {
            return Err(EventBusError::ConnectionFailed(
                "buffer_size must be greater than 0".to_string(),
            ));
        }

        let timeout = self.timeout.unwrap_or(DEFAULT_TIMEOUT);
        let acks = self.producer_acks.as_deref().unwrap_or("1");
        let compression = self.compression.as_deref().unwrap_or("none");

        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", &brokers)
            .set("message.timeout.ms", timeout.as_millis().to_string())
            .set("acks", acks)
            .set("compression.type", compression)
            .create()
            .map_err(|e| EventBusError::ConnectionFailed(format!("Failed to create producer: {e}")))?;

        let auto_offset_reset = self
            .auto_offset_reset
            .unwrap_or_else(|| DEFAULT_OFFSET_RESET.to_string());

        tracing::info!(
            brokers = %brokers,
            acks,
            compression,
            buffer_size,
            auto_offset_reset = %auto_offset_reset,
            "Redpanda event bus created"
        );

        Ok(RedpandaEventBus {
            producer,
            brokers,
            timeout,
            consumer_group: self.consumer_group,
            buffer_size,
            auto_offset_reset,
        })
    }
}

/// Copy a Kafka record into a [`BusMessage`].
fn to_bus_message(message: &BorrowedMessage<'_>) -> Result<BusMessage, EventBusError> {
    let payload = message
        .payload()
        .ok_or_else(|| EventBusError::DeserializationFailed("Message has no payload".to_string()))?;
    let key = message
        .key()
        .map(|key| String::from_utf8_lossy(key).into_owned());

    Ok(BusMessage {
        key,
        payload: payload.to_vec(),
    })
}

impl EventBus for RedpandaEventBus {
    fn publish(
        &self,
        topic: &str,
        message: &BusMessage,
    ) -> Pin<Box<dyn Future<Output = Result<(), EventBusError>> + Send + '_>> {
        let topic = topic.to_string();
        let message = message.clone();

        Box::pin(async move {
            let mut record = FutureRecord::to(&topic).payload(&message.payload);
            if let Some(key) = message.key.as_deref() {
                record = record.key(key);
            }

            match self.producer.send(record, Timeout::After(self.timeout)).await {
                Ok((partition, offset)) => {
                    tracing::debug!(
                        topic = %topic,
                        partition,
                        offset,
                        key = ?message.key,
                        "Message published"
                    );
                    Ok(())
                }
                Err((kafka_error, _)) => {
                    tracing::error!(topic = %topic, error = %kafka_error, "Failed to publish message");
                    Err(EventBusError::PublishFailed {
                        topic,
                        reason: kafka_error.to_string(),
                    })
                }
            }
        })
    }

    fn subscribe(
        &self,
        topics: &[&str],
    ) -> Pin<Box<dyn Future<Output = Result<EventStream, EventBusError>> + Send + '_>> {
        let topics: Vec<String> = topics.iter().map(|s| (*s).to_string()).collect();

        Box::pin(async move {
            let group_id = self.consumer_group_for(&topics);

            let consumer: StreamConsumer = ClientConfig::new()
                .set("bootstrap.servers", &self.brokers)
                .set("group.id", &group_id)
                .set("enable.auto.commit", "false")
                .set("auto.offset.reset", &self.auto_offset_reset)
                .set("session.timeout.ms", "6000")
                .set("enable.partition.eof", "false")
                .create()
                .map_err(|e| EventBusError::SubscriptionFailed {
                    topics: topics.clone(),
                    reason: format!("Failed to create consumer: {e}"),
                })?;

            let topic_refs: Vec<&str> = topics.iter().map(String::as_str).collect();
            consumer
                .subscribe(&topic_refs)
                .map_err(|e| EventBusError::SubscriptionFailed {
                    topics: topics.clone(),
                    reason: format!("Failed to subscribe: {e}"),
                })?;

            tracing::info!(
                topics = ?topics,
                consumer_group = %group_id,
                auto_offset_reset = %self.auto_offset_reset,
                "Subscribed to topics"
            );

            let (tx, mut rx) = tokio::sync::mpsc::channel(self.buffer_size);

            tokio::spawn(async move {
                use futures::StreamExt;

                let mut stream = consumer.stream();
                while let Some(received) = stream.next().await {
                    let message = match received {
                        Ok(message) => message,
                        Err(e) => {
                            let err = EventBusError::TransportError(format!(
                                "Failed to receive message: {e}"
                            ));
                            if tx.send(Err(err)).await.is_err() {
                                break;
                            }
                            continue;
                        }
                    };

                    // Commit only after hand-off; a dropped receiver leaves the
                    // offset uncommitted so the message is redelivered.
                    if tx.send(to_bus_message(&message)).await.is_err() {
                        tracing::debug!("Subscriber dropped, stopping consumer task");
                        break;
                    }

                    if let Err(e) = consumer.commit_message(&message, CommitMode::Async) {
                        tracing::warn!(
                            topic = message.topic(),
                            partition = message.partition(),
                            offset = message.offset(),
                            error = %e,
                            "Failed to commit offset, message may be redelivered"
                        );
                    }
                }

                tracing::debug!("Consumer task exiting");
            });

            let stream = async_stream::stream! {
                while let Some(result) = rx.recv().await {
                    yield result;
                }
            };

            Ok(Box::pin(stream) as EventStream)
        })
    }
}
