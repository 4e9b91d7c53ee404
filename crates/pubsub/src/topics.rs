//! Topic names and create-if-absent provisioning.

use bookshelf_core::{Error, Result};
use tracing::debug;

use crate::broker::{Broker, Topic};

/// Topic the web tier publishes `processBook` items to.
pub const DEFAULT_TOPIC: &str = "book-process-queue";

/// Subscription every worker replica shares.
pub const DEFAULT_SUBSCRIPTION: &str = "shared-worker-subscription";

/// Returns a handle to `name`, creating the topic if it does not exist.
///
/// Whoever connects first creates the topic; everyone else gets
/// [`Error::TopicExists`] from the broker and falls back to a lookup.
pub async fn ensure_topic(broker: &dyn Broker, name: &str) -> Result<Topic> {
    match broker.create_topic(name).await {
        Ok(topic) => Ok(topic),
        Err(Error::TopicExists(_)) => {
            debug!(topic = %name, "Topic already exists, looking it up");
            broker.topic(name).await
        }
        Err(e) => Err(e),
    }
}
