//! Subscription offsets kept in ClickHouse next to the books.

use async_trait::async_trait;
use bookshelf_core::{Error, OffsetKey, OffsetStore, Result};
use clickhouse::Row;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::client::ClickHouseClient;
use crate::clickhouse_store::VersionClock;

#[derive(Debug, Clone, Row, Serialize, Deserialize)]
pub struct OffsetRow {
    pub subscription: String,
    pub topic: String,
    pub partition: i32,
    pub next_offset: i64,
    pub version: u64,
}

impl OffsetRow {
    fn new(key: &OffsetKey, next_offset: i64, version: u64) -> Self {
        Self {
            subscription: key.subscription.clone(),
            topic: key.topic.clone(),
            partition: key.partition,
            next_offset,
            version,
        }
    }
}

/// One row per (subscription, topic, partition); the newest version wins.
pub struct ClickHouseOffsetStore {
    client: ClickHouseClient,
    versions: VersionClock,
}

impl ClickHouseOffsetStore {
    pub fn new(client: ClickHouseClient) -> Self {
        Self {
            client,
            versions: VersionClock::default(),
        }
    }
}

#[async_trait]
impl OffsetStore for ClickHouseOffsetStore {
    async fn load(&self, key: &OffsetKey) -> Result<Option<i64>> {
        self.client
            .inner()
            .query(
                "SELECT next_offset FROM subscription_offsets FINAL \
                 WHERE subscription = ? AND topic = ? AND partition = ? LIMIT 1",
            )
            .bind(key.subscription.as_str())
            .bind(key.topic.as_str())
            .bind(key.partition)
            .fetch_optional::<i64>()
            .await
            .map_err(|e| Error::storage(format!("Offset query error: {}", e)))
    }

    async fn commit(&self, key: &OffsetKey, next: i64) -> Result<()> {
        let row = OffsetRow::new(key, next, self.versions.next());

        let mut insert = self
            .client
            .inner()
            .insert("subscription_offsets")
            .map_err(|e| Error::storage(format!("Insert error: {}", e)))?;
        insert
            .write(&row)
            .await
            .map_err(|e| Error::storage(format!("Write error: {}", e)))?;
        insert
            .end()
            .await
            .map_err(|e| Error::storage(format!("End error: {}", e)))?;

        debug!(key = %key, next_offset = next, "Committed offset");
        Ok(())
    }
}
