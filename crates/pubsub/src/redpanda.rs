//! Redpanda broker adapter using rskafka.
//!
//! - Topics are created through the controller client; `TopicAlreadyExists`
//!   maps to [`Error::TopicExists`] so callers fall back to a lookup.
//! - Work items are spread over the topic's partitions round-robin.
//! - rskafka has no consumer-group coordination. Each worker replica reads
//!   the partitions dealt to it by `member`/`members`, and the subscription's
//!   position on every partition is committed to an [`OffsetStore`], so a
//!   restarted replica picks up what arrived while it was down.
//! - A subscription with no committed position starts at the latest offset
//!   and commits it right away.
//! - Auto-ack: the position moves past a record once its handler returns.

use async_trait::async_trait;
use bookshelf_core::{Error, OffsetKey, OffsetStore, Result};
use bytes::Bytes;
use chrono::Utc;
use rskafka::client::{
    error::{Error as KafkaError, ProtocolError},
    partition::{Compression, OffsetAt, PartitionClient, UnknownTopicHandling},
    Client, ClientBuilder, Credentials, SaslConfig,
};
use rskafka::record::Record;
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{watch, Mutex, RwLock};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::broker::{cancelled, Broker, MessageHandler, Subscription, Topic};
use crate::config::RedpandaConfig;
use crate::partitioner::{assigned_partitions, RoundRobin};

/// Next offset to read on one partition; `None` until first fetch.
/// Shared by subscribers in this process that use the same subscription.
type Cursor = Arc<Mutex<Option<i64>>>;

/// Creates a TLS configuration for Redpanda Cloud.
fn create_tls_config() -> Arc<rustls::ClientConfig> {
    let root_store =
        rustls::RootCertStore::from_iter(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    let config = rustls::ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    Arc::new(config)
}

/// Where a subscription starts reading a partition: the committed offset,
/// or else `latest`, which is committed before it is returned.
pub(crate) async fn resume_offset<F, Fut>(
    offsets: &dyn OffsetStore,
    key: &OffsetKey,
    latest: F,
) -> Result<i64>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<i64>>,
{
    if let Some(next) = offsets.load(key).await? {
        info!(key = %key, offset = next, "Resuming subscription");
        return Ok(next);
    }

    let next = latest().await?;
    offsets.commit(key, next).await?;
    info!(key = %key, offset = next, "Subscription starting at latest offset");
    Ok(next)
}

/// Broker backed by a Redpanda (Kafka-compatible) cluster.
pub struct RedpandaBroker {
    config: RedpandaConfig,
    offsets: Arc<dyn OffsetStore>,
    /// Established on first use, reused for the process lifetime
    client: RwLock<Option<Arc<Client>>>,
    /// Partition ids per topic
    topics: RwLock<HashMap<String, Vec<i32>>>,
    /// Cached partition clients per (topic, partition)
    partitions: RwLock<BTreeMap<(String, i32), Arc<PartitionClient>>>,
    cursors: parking_lot::Mutex<HashMap<OffsetKey, Cursor>>,
    round_robin: RoundRobin,
}

impl RedpandaBroker {
    pub fn new(config: RedpandaConfig, offsets: Arc<dyn OffsetStore>) -> Self {
        Self {
            config,
            offsets,
            client: RwLock::new(None),
            topics: RwLock::new(HashMap::new()),
            partitions: RwLock::new(BTreeMap::new()),
            cursors: parking_lot::Mutex::new(HashMap::new()),
            round_robin: RoundRobin::default(),
        }
    }

    async fn client(&self) -> Result<Arc<Client>> {
        {
            let client = self.client.read().await;
            if let Some(ref c) = *client {
                return Ok(c.clone());
            }
        }

        let mut guard = self.client.write().await;
        if let Some(ref c) = *guard {
            return Ok(c.clone());
        }

        let mut builder = ClientBuilder::new(vec![self.config.broker_string()]);

        // Add TLS and SASL auth if credentials provided (for Redpanda Cloud)
        if let Some((username, password)) = self.config.credentials() {
            builder = builder
                .tls_config(create_tls_config())
                .sasl_config(SaslConfig::ScramSha256(Credentials::new(
                    username.to_string(),
                    password.to_string(),
                )));
        }

        let client = builder
            .build()
            .await
            .map_err(|e| Error::broker(format!("Failed to connect to Redpanda: {}", e)))?;

        info!(brokers = %self.config.broker_string(), "Connected to Redpanda");

        let client = Arc::new(client);
        *guard = Some(client.clone());
        Ok(client)
    }

    /// Partition ids of an existing topic, from cluster metadata.
    async fn partition_ids(&self, topic: &str) -> Result<Vec<i32>> {
        if let Some(ids) = self.topics.read().await.get(topic) {
            return Ok(ids.clone());
        }

        let client = self.client().await?;
        let listed = client
            .list_topics()
            .await
            .map_err(|e| Error::broker(format!("Failed to list topics: {}", e)))?;

        let ids: Vec<i32> = listed
            .into_iter()
            .find(|t| t.name == topic)
            .map(|t| t.partitions.into_iter().collect())
            .unwrap_or_default();
        if ids.is_empty() {
            return Err(Error::broker(format!("Topic {} not found", topic)));
        }

        self.topics
            .write()
            .await
            .insert(topic.to_string(), ids.clone());
        Ok(ids)
    }

    /// Gets or creates the client for one partition of a topic.
    async fn partition(&self, topic: &str, partition: i32) -> Result<Arc<PartitionClient>> {
        let key = (topic.to_string(), partition);
        {
            let partitions = self.partitions.read().await;
            if let Some(client) = partitions.get(&key) {
                return Ok(client.clone());
            }
        }

        let client = self.client().await?;
        let partition_client = client
            .partition_client(topic.to_string(), partition, UnknownTopicHandling::Retry)
            .await
            .map_err(|e| Error::broker(format!("Failed to get partition client: {}", e)))?;

        let partition_client = Arc::new(partition_client);
        self.partitions
            .write()
            .await
            .insert(key, partition_client.clone());

        Ok(partition_client)
    }

    fn cursor(&self, key: &OffsetKey) -> Cursor {
        self.cursors
            .lock()
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(None)))
            .clone()
    }

    fn compression(&self) -> Compression {
        match self.config.compression.as_str() {
            "gzip" => Compression::Gzip,
            "snappy" => Compression::Snappy,
            "lz4" => Compression::Lz4,
            "zstd" => Compression::Zstd,
            _ => Compression::NoCompression,
        }
    }
}

#[async_trait]
impl Broker for RedpandaBroker {
    async fn create_topic(&self, name: &str) -> Result<Topic> {
        let client = self.client().await?;
        let controller = client
            .controller_client()
            .map_err(|e| Error::broker(format!("Failed to get controller client: {}", e)))?;

        match controller
            .create_topic(
                name,
                self.config.partitions,
                self.config.replication_factor,
                self.config.create_timeout_ms,
            )
            .await
        {
            Ok(()) => {
                info!(topic = %name, partitions = self.config.partitions, "Created topic");
                self.topics
                    .write()
                    .await
                    .insert(name.to_string(), (0..self.config.partitions).collect());
                Ok(Topic::new(name))
            }
            Err(KafkaError::ServerError {
                protocol_error: ProtocolError::TopicAlreadyExists,
                ..
            }) => Err(Error::TopicExists(name.to_string())),
            Err(e) => Err(Error::broker(format!("Failed to create topic {}: {}", name, e))),
        }
    }

    async fn topic(&self, name: &str) -> Result<Topic> {
        self.partition_ids(name).await?;
        Ok(Topic::new(name))
    }

    async fn publish(&self, topic: &Topic, payload: Bytes) -> Result<()> {
        let ids = self.partition_ids(topic.name()).await?;
        let partition = self
            .round_robin
            .pick(&ids)
            .ok_or_else(|| Error::broker(format!("Topic {} has no partitions", topic.name())))?;
        let client = self.partition(topic.name(), partition).await?;

        let record = Record {
            key: None,
            value: Some(payload.to_vec()),
            headers: BTreeMap::new(),
            timestamp: Utc::now(),
        };

        client
            .produce(vec![record], self.compression())
            .await
            .map_err(|e| {
                error!(partition, "Failed to publish to Redpanda: {}", e);
                Error::broker(format!("Failed to produce: {}", e))
            })?;

        Ok(())
    }

    async fn subscribe(
        &self,
        topic: &Topic,
        subscription: &str,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<Subscription> {
        let ids = self.partition_ids(topic.name()).await?;
        let owned = assigned_partitions(&ids, self.config.member, self.config.members);
        info!(
            topic = %topic.name(),
            subscription = %subscription,
            member = self.config.member,
            members = self.config.members,
            partitions = ?owned,
            "Reading assigned partitions"
        );

        let mut readers = Vec::with_capacity(owned.len());
        for partition in owned {
            let key = OffsetKey::new(subscription, topic.name(), partition);
            readers.push(PartitionReader {
                client: self.partition(topic.name(), partition).await?,
                cursor: self.cursor(&key),
                key,
                offsets: self.offsets.clone(),
                handler: handler.clone(),
                max_bytes: self.config.fetch_max_bytes.max(1),
                max_wait_ms: self.config.fetch_max_wait_ms,
            });
        }

        Ok(Subscription::spawn(
            subscription,
            topic.clone(),
            move |mut cancel| async move {
                if readers.is_empty() {
                    warn!("No partitions assigned to this replica, idling");
                    cancelled(&mut cancel).await;
                    return Ok(());
                }

                let mut tasks = JoinSet::new();
                for reader in readers {
                    tasks.spawn(reader.run(cancel.clone()));
                }

                // The first reader to fail ends the subscription.
                while let Some(joined) = tasks.join_next().await {
                    joined.map_err(|e| Error::broker(format!("Partition reader died: {}", e)))??;
                }
                Ok(())
            },
        ))
    }

    async fn health_check(&self) -> bool {
        let client = match self.client().await {
            Ok(client) => client,
            Err(e) => {
                error!("Redpanda health check failed: {}", e);
                return false;
            }
        };

        match client.list_topics().await {
            Ok(topics) => {
                debug!(topics = topics.len(), "Redpanda connection healthy");
                true
            }
            Err(e) => {
                error!("Failed to list Redpanda topics: {}", e);
                false
            }
        }
    }
}

/// Delivery loop for one partition of one subscription.
struct PartitionReader {
    client: Arc<PartitionClient>,
    key: OffsetKey,
    cursor: Cursor,
    offsets: Arc<dyn OffsetStore>,
    handler: Arc<dyn MessageHandler>,
    max_bytes: i32,
    max_wait_ms: i32,
}

impl PartitionReader {
    async fn offset_at(&self, at: OffsetAt) -> Result<i64> {
        self.client
            .get_offset(at)
            .await
            .map_err(|e| Error::broker(format!("Failed to get offset: {}", e)))
    }

    async fn commit(&self, next: i64) {
        if let Err(e) = self.offsets.commit(&self.key, next).await {
            warn!(key = %self.key, offset = next, error = %e, "Failed to commit offset");
        }
    }

    async fn run(self, mut cancel: watch::Receiver<bool>) -> Result<()> {
        loop {
            let mut position = tokio::select! {
                biased;
                _ = cancelled(&mut cancel) => return Ok(()),
                guard = self.cursor.lock() => guard,
            };

            let offset = match *position {
                Some(offset) => offset,
                None => {
                    let offset =
                        resume_offset(self.offsets.as_ref(), &self.key, || {
                            self.offset_at(OffsetAt::Latest)
                        })
                        .await?;
                    *position = Some(offset);
                    offset
                }
            };

            let fetched = tokio::select! {
                biased;
                _ = cancelled(&mut cancel) => return Ok(()),
                fetched = self.client.fetch_records(offset, 1..self.max_bytes, self.max_wait_ms) => fetched,
            };

            let records = match fetched {
                Ok((records, _high_watermark)) => records,
                Err(KafkaError::ServerError {
                    protocol_error: ProtocolError::OffsetOutOfRange,
                    ..
                }) => {
                    let earliest = self.offset_at(OffsetAt::Earliest).await?;
                    warn!(
                        key = %self.key,
                        offset,
                        earliest,
                        "Offset out of range, restarting from earliest retained record"
                    );
                    *position = Some(earliest);
                    self.commit(earliest).await;
                    continue;
                }
                Err(e) => {
                    error!(key = %self.key, "Fetch error: {}", e);
                    return Err(Error::broker(format!("Failed to fetch records: {}", e)));
                }
            };

            if !records.is_empty() {
                debug!(key = %self.key, count = records.len(), offset, "Fetched records");
            }

            // A fetch returns whole batches, which may start before `offset`.
            for record in records.into_iter().filter(|r| r.offset >= offset) {
                if let Some(value) = record.record.value {
                    self.handler.handle(Bytes::from(value)).await;
                }
                let next = record.offset + 1;
                *position = Some(next);
                self.commit(next).await;

                if *cancel.borrow() {
                    return Ok(());
                }
            }
        }
    }
}
