//! Book persistence, subscription offsets, and cover image storage.
//!
//! Backends are picked once at startup by [`open_store`],
//! [`open_offset_store`], and [`open_blob_store`] and handed around as
//! trait objects.

pub mod blob;
pub mod client;
pub mod clickhouse_store;
pub mod config;
pub mod health;
pub mod memory;
pub mod offsets;
pub mod schema;
pub mod store;

pub use blob::*;
pub use client::ClickHouseClient;
pub use clickhouse_store::ClickHouseStore;
pub use config::*;
pub use memory::MemoryStore;
pub use offsets::ClickHouseOffsetStore;
pub use store::*;

use bookshelf_core::{BookQueue, MemoryOffsetStore, OffsetStore, Result};
use std::sync::Arc;
use telemetry::health as component_health;
use tracing::info;

/// Builds the configured book store. ClickHouse schema is created here.
pub async fn open_store(
    config: &StorageConfig,
    queue: Arc<dyn BookQueue>,
) -> Result<Arc<dyn BookStore>> {
    let store: Arc<dyn BookStore> = match config.backend {
        DataBackend::Memory => Arc::new(MemoryStore::new(queue)),
        DataBackend::Clickhouse => {
            let client = ClickHouseClient::new(config.clickhouse.clone());
            health::init_schema(&client).await?;
            Arc::new(ClickHouseStore::new(client, queue))
        }
    };

    check_store(store.as_ref()).await;
    info!(backend = ?config.backend, "Book store ready");
    Ok(store)
}

/// Builds the store that keeps worker subscription offsets. With the memory
/// backend offsets do not survive a restart.
pub async fn open_offset_store(config: &StorageConfig) -> Result<Arc<dyn OffsetStore>> {
    match config.backend {
        DataBackend::Memory => Ok(Arc::new(MemoryOffsetStore::new())),
        DataBackend::Clickhouse => {
            let client = ClickHouseClient::new(config.clickhouse.clone());
            health::init_schema(&client).await?;
            Ok(Arc::new(ClickHouseOffsetStore::new(client)))
        }
    }
}

/// Builds the cover blob store. Without a bucket there is nowhere public to
/// put covers, so this returns `None` and cover mirroring is switched off.
pub fn open_blob_store(config: &BlobConfig) -> Option<Arc<dyn BlobStore>> {
    let bucket = config.bucket.as_ref()?;
    info!(bucket = %bucket, "Cover bucket configured");
    Some(Arc::new(GcsBlobStore::new(bucket.clone(), config)))
}

/// Probes the store and records the result in the global health registry.
pub async fn check_store(store: &dyn BookStore) -> bool {
    let healthy = store.health_check().await;
    component_health().storage.record(healthy, "storage unreachable");
    healthy
}
