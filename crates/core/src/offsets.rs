//! Committed read positions for broker subscriptions.
//!
//! A subscription's position on each partition lives outside the worker
//! process, so a restarted or newly added replica resumes where the
//! subscription left off instead of skipping what arrived while it was down.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;

use crate::error::Result;

/// One subscription's position on one partition of a topic.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OffsetKey {
    pub subscription: String,
    pub topic: String,
    pub partition: i32,
}

impl OffsetKey {
    pub fn new(subscription: impl Into<String>, topic: impl Into<String>, partition: i32) -> Self {
        Self {
            subscription: subscription.into(),
            topic: topic.into(),
            partition,
        }
    }
}

impl fmt::Display for OffsetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.subscription, self.topic, self.partition)
    }
}

#[async_trait]
pub trait OffsetStore: Send + Sync {
    /// Next offset to read, or `None` if nothing was ever committed.
    async fn load(&self, key: &OffsetKey) -> Result<Option<i64>>;

    /// Records `next` as the next offset to read.
    async fn commit(&self, key: &OffsetKey, next: i64) -> Result<()>;
}

/// Offsets held in process memory. Lost on restart.
#[derive(Debug, Default)]
pub struct MemoryOffsetStore {
    offsets: Mutex<HashMap<OffsetKey, i64>>,
}

impl MemoryOffsetStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OffsetStore for MemoryOffsetStore {
    async fn load(&self, key: &OffsetKey) -> Result<Option<i64>> {
        Ok(self.offsets.lock().get(key).copied())
    }

    async fn commit(&self, key: &OffsetKey, next: i64) -> Result<()> {
        self.offsets.lock().insert(key.clone(), next);
        Ok(())
    }
}
