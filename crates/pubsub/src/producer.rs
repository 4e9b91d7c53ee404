//! Enqueue-on-write producer used by the web tier.

use bookshelf_core::{BookId, BookQueue, Result, WorkItem};
use bytes::Bytes;
use std::sync::Arc;
use std::time::Instant;
use telemetry::metrics;
use tokio::sync::RwLock;
use tracing::{error, info};

use crate::broker::{Broker, Topic};
use crate::topics::ensure_topic;

/// Publishes `processBook` work items for committed writes.
///
/// The topic handle is resolved on first use and cached, so the first
/// write after startup also creates the topic if nobody has yet.
#[derive(Clone)]
pub struct Producer {
    broker: Arc<dyn Broker>,
    topic_name: Arc<str>,
    topic: Arc<RwLock<Option<Topic>>>,
}

impl Producer {
    pub fn new(broker: Arc<dyn Broker>, topic_name: impl Into<Arc<str>>) -> Self {
        Self {
            broker,
            topic_name: topic_name.into(),
            topic: Arc::new(RwLock::new(None)),
        }
    }

    pub fn topic_name(&self) -> &str {
        &self.topic_name
    }

    async fn topic(&self) -> Result<Topic> {
        if let Some(topic) = self.topic.read().await.as_ref() {
            return Ok(topic.clone());
        }

        let mut cached = self.topic.write().await;
        if let Some(topic) = cached.as_ref() {
            return Ok(topic.clone());
        }

        let topic = ensure_topic(self.broker.as_ref(), &self.topic_name).await?;
        *cached = Some(topic.clone());
        Ok(topic)
    }

    /// Publishes one `processBook` item and waits for the broker to accept it.
    pub async fn enqueue(&self, id: &BookId) -> Result<()> {
        let start = Instant::now();
        let payload = WorkItem::process_book(id.clone()).to_bytes()?;
        let topic = self.topic().await?;

        self.broker.publish(&topic, Bytes::from(payload)).await?;

        let m = metrics();
        m.books_queued.inc();
        m.publish_latency_ms.observe(start.elapsed().as_millis() as u64);

        info!("Book {} queued for background processing", id);
        Ok(())
    }
}

impl BookQueue for Producer {
    /// Fire-and-forget: the publish runs on its own task and failures are
    /// only logged.
    fn queue_book(&self, id: &BookId) {
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                metrics().queue_errors.inc();
                error!(book_id = %id, "No async runtime, book not queued");
                return;
            }
        };

        let producer = self.clone();
        let id = id.clone();
        handle.spawn(async move {
            if let Err(e) = producer.enqueue(&id).await {
                metrics().queue_errors.inc();
                error!(book_id = %id, error = %e, "Failed to queue book");
            }
        });
    }
}
