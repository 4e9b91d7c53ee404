//! Publish/subscribe plumbing for the bookshelf pipeline.
//!
//! The [`Broker`] trait hides the message-queue vendor behind topic
//! creation, publish, and subscribe. Two adapters exist: a process-local
//! [`InMemoryBroker`] with competing-consumer delivery, and a
//! [`RedpandaBroker`] over rskafka. The [`Producer`] sits in the web tier
//! and turns committed writes into `processBook` work items.

pub mod broker;
pub mod config;
pub mod health;
pub mod memory;
pub mod partitioner;
pub mod producer;
pub mod redpanda;
pub mod topics;

pub use broker::*;
pub use config::*;
pub use health::check_broker;
pub use memory::InMemoryBroker;
pub use producer::*;
pub use redpanda::RedpandaBroker;
pub use topics::*;

use bookshelf_core::OffsetStore;
use std::sync::Arc;

/// Builds the broker selected by configuration. Called once at startup.
///
/// `offsets` is where the Redpanda adapter commits subscription positions;
/// the in-memory broker ignores it.
pub fn connect(config: &PubSubConfig, offsets: Arc<dyn OffsetStore>) -> Arc<dyn Broker> {
    match config.backend {
        BrokerBackend::Memory => Arc::new(InMemoryBroker::new()),
        BrokerBackend::Redpanda => {
            Arc::new(RedpandaBroker::new(config.redpanda.clone(), offsets))
        }
    }
}
