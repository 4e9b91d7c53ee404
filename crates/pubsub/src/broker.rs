//! Broker abstraction: topics, publish, and auto-ack subscriptions.

use async_trait::async_trait;
use bookshelf_core::{Error, Result};
use bytes::Bytes;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Handle to a topic that is known to exist on the broker.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Topic {
    name: String,
}

impl Topic {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Receives delivered payloads.
///
/// Delivery is auto-ack: the broker treats a message as handled as soon as
/// `handle` returns, whatever happened inside it.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, payload: Bytes);
}

/// A durable topic/subscription message broker.
#[async_trait]
pub trait Broker: Send + Sync {
    /// Creates a topic. Fails with [`Error::TopicExists`] if it is already there.
    async fn create_topic(&self, name: &str) -> Result<Topic>;

    /// Looks up an existing topic.
    async fn topic(&self, name: &str) -> Result<Topic>;

    async fn publish(&self, topic: &Topic, payload: Bytes) -> Result<()>;

    /// Attaches `handler` to the named subscription, creating the
    /// subscription if needed. Subscribers sharing a subscription name
    /// compete for its messages.
    async fn subscribe(
        &self,
        topic: &Topic,
        subscription: &str,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<Subscription>;

    /// Cheap connectivity probe.
    async fn health_check(&self) -> bool {
        true
    }
}

/// Detaches a subscriber. Clonable so it can outlive the [`Subscription`].
#[derive(Debug, Clone)]
pub struct CancelHandle(Arc<watch::Sender<bool>>);

impl CancelHandle {
    /// Stops further deliveries to this subscriber. A message already being
    /// handled runs to completion; the subscription itself is not deleted.
    pub fn cancel(&self) {
        self.0.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.0.borrow()
    }
}

/// A live subscriber: a delivery task plus the switch that stops it.
pub struct Subscription {
    name: String,
    topic: Topic,
    cancel: CancelHandle,
    task: Option<JoinHandle<Result<()>>>,
}

impl Subscription {
    /// Spawns `delivery` as this subscriber's loop. The loop receives a
    /// watch channel that flips to `true` on cancel and should exit between
    /// messages when it does. An `Err` from the loop means the connection to
    /// the broker is gone.
    pub fn spawn<F, Fut>(name: impl Into<String>, topic: Topic, delivery: F) -> Self
    where
        F: FnOnce(watch::Receiver<bool>) -> Fut,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let (tx, rx) = watch::channel(false);
        let task = tokio::spawn(delivery(rx));

        Self {
            name: name.into(),
            topic,
            cancel: CancelHandle(Arc::new(tx)),
            task: Some(task),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn topic(&self) -> &Topic {
        &self.topic
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Waits for the delivery loop to end.
    ///
    /// Returns `Ok(())` after a cancel and the loop's error when the broker
    /// connection broke.
    pub async fn closed(&mut self) -> Result<()> {
        match self.task.take() {
            Some(task) => task
                .await
                .map_err(|e| Error::broker(format!("subscription task failed: {}", e)))?,
            None => Ok(()),
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if self.task.is_some() {
            self.cancel.cancel();
        }
    }
}

/// Resolves when `cancelled` flips to true or its sender goes away.
pub(crate) async fn cancelled(cancelled: &mut watch::Receiver<bool>) {
    loop {
        if *cancelled.borrow_and_update() {
            return;
        }
        if cancelled.changed().await.is_err() {
            return;
        }
    }
}
