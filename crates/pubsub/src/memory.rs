//! In-memory broker for tests and single-process deployments.
//!
//! Semantics follow a managed pub/sub service:
//! - publishing to a missing topic is an error
//! - a message is copied to every subscription on the topic at publish time;
//!   topics with no subscriptions drop messages
//! - subscribers that share a subscription name compete for its messages,
//!   so each message reaches exactly one of them

use async_trait::async_trait;
use bookshelf_core::{Error, Result};
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

use crate::broker::{cancelled, Broker, MessageHandler, Subscription, Topic};

type SharedReceiver = Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<Bytes>>>;

/// One named subscription: a queue shared by all of its subscribers.
struct SubscriptionQueue {
    tx: mpsc::UnboundedSender<Bytes>,
    rx: SharedReceiver,
}

impl SubscriptionQueue {
    fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: Arc::new(tokio::sync::Mutex::new(rx)),
        }
    }
}

#[derive(Default)]
struct TopicState {
    subscriptions: HashMap<String, SubscriptionQueue>,
}

#[derive(Default)]
struct State {
    topics: HashMap<String, TopicState>,
    publish_count: usize,
    /// Accepted publishes in order; only kept by a [`InMemoryBroker::recording`] broker.
    log: Option<Vec<(String, Bytes)>>,
}

/// Process-local broker. Clones share the same topics.
#[derive(Clone, Default)]
pub struct InMemoryBroker {
    state: Arc<Mutex<State>>,
}

impl InMemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// A broker that also keeps every accepted payload for inspection.
    /// Memory grows with each publish, so this is for tests only.
    pub fn recording() -> Self {
        let broker = Self::default();
        broker.state.lock().log = Some(Vec::new());
        broker
    }

    /// Payloads accepted on `topic`, oldest first. Always empty unless the
    /// broker was built with [`InMemoryBroker::recording`].
    pub fn published(&self, topic: &str) -> Vec<Bytes> {
        self.state
            .lock()
            .log
            .iter()
            .flatten()
            .filter(|(name, _)| name == topic)
            .map(|(_, payload)| payload.clone())
            .collect()
    }

    /// Total number of accepted publishes across all topics.
    pub fn publish_count(&self) -> usize {
        self.state.lock().publish_count
    }

    pub fn has_topic(&self, name: &str) -> bool {
        self.state.lock().topics.contains_key(name)
    }

    /// Messages waiting in a subscription, or `None` if it does not exist.
    pub fn backlog(&self, topic: &str, subscription: &str) -> Option<usize> {
        let state = self.state.lock();
        let queue = state.topics.get(topic)?.subscriptions.get(subscription)?;
        queue.rx.try_lock().map(|rx| rx.len()).ok()
    }
}

#[async_trait]
impl Broker for InMemoryBroker {
    async fn create_topic(&self, name: &str) -> Result<Topic> {
        let mut state = self.state.lock();
        if state.topics.contains_key(name) {
            return Err(Error::TopicExists(name.to_string()));
        }
        state.topics.insert(name.to_string(), TopicState::default());
        debug!(topic = %name, "Created topic");
        Ok(Topic::new(name))
    }

    async fn topic(&self, name: &str) -> Result<Topic> {
        if self.has_topic(name) {
            Ok(Topic::new(name))
        } else {
            Err(Error::broker(format!("topic {} not found", name)))
        }
    }

    async fn publish(&self, topic: &Topic, payload: Bytes) -> Result<()> {
        let mut state = self.state.lock();
        let topic_state = state
            .topics
            .get(topic.name())
            .ok_or_else(|| Error::broker(format!("topic {} not found", topic.name())))?;

        for queue in topic_state.subscriptions.values() {
            // The receiver lives as long as the queue entry, so this cannot fail.
            let _ = queue.tx.send(payload.clone());
        }

        state.publish_count += 1;
        if let Some(log) = state.log.as_mut() {
            log.push((topic.name().to_string(), payload));
        }
        Ok(())
    }

    async fn subscribe(
        &self,
        topic: &Topic,
        subscription: &str,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<Subscription> {
        let rx = {
            let mut state = self.state.lock();
            let topic_state = state
                .topics
                .get_mut(topic.name())
                .ok_or_else(|| Error::broker(format!("topic {} not found", topic.name())))?;

            topic_state
                .subscriptions
                .entry(subscription.to_string())
                .or_insert_with(SubscriptionQueue::new)
                .rx
                .clone()
        };

        let name = subscription.to_string();
        Ok(Subscription::spawn(
            subscription,
            topic.clone(),
            move |mut cancel| async move {
                loop {
                    let next = async { rx.lock().await.recv().await };

                    tokio::select! {
                        biased;
                        _ = cancelled(&mut cancel) => return Ok(()),
                        message = next => match message {
                            Some(payload) => handler.handle(payload).await,
                            None => {
                                return Err(Error::broker(format!(
                                    "subscription {} closed",
                                    name
                                )))
                            }
                        },
                    }
                }
            },
        ))
    }
}
