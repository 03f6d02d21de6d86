//! In-memory event bus.
//!
//! Each topic is a `tokio::sync::broadcast` channel. Subscribers only see
//! messages published after they subscribed, which matches a consumer group
//! starting at the log head. Every publish is also recorded so tests can
//! assert on what the admission controller emitted.

use async_stream::stream;
use boxoffice_core::event_bus::{BusMessage, EventBus, EventBusError, EventStream};
use futures::stream::{SelectAll, StreamExt};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast;

const CHANNEL_CAPACITY: usize = 1024;

#[derive(Default)]
struct Inner {
    topics: Mutex<HashMap<String, broadcast::Sender<BusMessage>>>,
    published: Mutex<Vec<(String, BusMessage)>>,
    fail_publishes: AtomicBool,
    fail_subscribes: AtomicUsize,
    subscriptions: AtomicUsize,
}

impl Inner {
    fn topics(&self) -> MutexGuard<'_, HashMap<String, broadcast::Sender<BusMessage>>> {
        self.topics.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn sender(&self, topic: &str) -> broadcast::Sender<BusMessage> {
        self.topics()
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .clone()
    }
}

/// In-memory [`EventBus`] for tests.
///
/// Cloning is cheap; clones share topics and the publish record.
#[derive(Clone, Default)]
pub struct InMemoryEventBus {
    inner: Arc<Inner>,
}

impl InMemoryEventBus {
    /// Create a bus with no topics.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every successful publish so far, as `(topic, message)`.
    #[must_use]
    pub fn published(&self) -> Vec<(String, BusMessage)> {
        self.inner
            .published
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Make publishes fail until switched back.
    pub fn set_fail_publishes(&self, fail: bool) {
        self.inner.fail_publishes.store(fail, Ordering::SeqCst);
    }

    /// Make the next `n` subscribe calls fail.
    pub fn fail_next_subscribes(&self, n: usize) {
        self.inner.fail_subscribes.store(n, Ordering::SeqCst);
    }

    /// Successful subscribe calls so far.
    #[must_use]
    pub fn subscriptions(&self) -> usize {
        self.inner.subscriptions.load(Ordering::SeqCst)
    }

    /// Number of live receivers on `topic`.
    #[must_use]
    pub fn receiver_count(&self, topic: &str) -> usize {
        self.inner
            .topics()
            .get(topic)
            .map_or(0, broadcast::Sender::receiver_count)
    }

    /// Drop every topic channel, ending all open subscription streams.
    pub fn close_all(&self) {
        self.inner.topics().clear();
    }
}

impl EventBus for InMemoryEventBus {
    fn publish(
        &self,
        topic: &str,
        message: &BusMessage,
    ) -> Pin<Box<dyn Future<Output = Result<(), EventBusError>> + Send + '_>> {
        let topic = topic.to_string();
        let message = message.clone();
        Box::pin(async move {
            if self.inner.fail_publishes.load(Ordering::SeqCst) {
                return Err(EventBusError::PublishFailed {
                    topic,
                    reason: "broker unavailable".to_string(),
                });
            }

            // No subscribers is not an error: the message is simply not retained.
            let _ = self.inner.sender(&topic).send(message.clone());
            self.inner
                .published
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push((topic, message));
            Ok(())
        })
    }

    fn subscribe(
        &self,
        topics: &[&str],
    ) -> Pin<Box<dyn Future<Output = Result<EventStream, EventBusError>> + Send + '_>> {
        let topics: Vec<String> = topics.iter().map(|t| (*t).to_string()).collect();
        Box::pin(async move {
            let pending_failure = self
                .inner
                .fail_subscribes
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if pending_failure {
                return Err(EventBusError::SubscriptionFailed {
                    topics,
                    reason: "broker unavailable".to_string(),
                });
            }

            let mut merged = SelectAll::new();
            for topic in &topics {
                let mut receiver = self.inner.sender(topic).subscribe();
                let topic_stream = stream! {
                    loop {
                        match receiver.recv().await {
                            Ok(message) => {
                                yield Ok(message);
                            }
                            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                                yield Err(EventBusError::TransportError(format!(
                                    "subscriber lagged, {skipped} messages skipped"
                                )));
                            }
                            Err(broadcast::error::RecvError::Closed) => break,
                        }
                    }
                };
                merged.push(Box::pin(topic_stream));
            }

            self.inner.subscriptions.fetch_add(1, Ordering::SeqCst);
            let stream: EventStream = merged.boxed();
            Ok(stream)
        })
    }
}
