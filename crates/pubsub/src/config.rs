//! Broker configuration.

use serde::{Deserialize, Serialize};

use crate::topics::{DEFAULT_SUBSCRIPTION, DEFAULT_TOPIC};

/// Which broker adapter to build at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrokerBackend {
    /// Process-local queue; only reaches workers in the same process.
    Memory,
    /// Redpanda or any Kafka-compatible cluster.
    Redpanda,
}

impl std::str::FromStr for BrokerBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "redpanda" | "kafka" => Ok(Self::Redpanda),
            other => Err(format!("unknown broker backend: {}", other)),
        }
    }
}

/// Pipeline queue configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PubSubConfig {
    #[serde(default = "default_backend")]
    pub backend: BrokerBackend,
    /// Topic work items are published to
    #[serde(default = "default_topic")]
    pub topic: String,
    /// Subscription shared by every worker replica
    #[serde(default = "default_subscription")]
    pub subscription: String,
    #[serde(default)]
    pub redpanda: RedpandaConfig,
}

fn default_backend() -> BrokerBackend {
    BrokerBackend::Memory
}

fn default_topic() -> String {
    DEFAULT_TOPIC.to_string()
}

fn default_subscription() -> String {
    DEFAULT_SUBSCRIPTION.to_string()
}

impl Default for PubSubConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            topic: default_topic(),
            subscription: default_subscription(),
            redpanda: RedpandaConfig::default(),
        }
    }
}

/// Redpanda connection and topic settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedpandaConfig {
    /// Broker addresses
    pub brokers: Vec<String>,
    /// SASL username (for cloud authentication)
    #[serde(default)]
    pub sasl_username: Option<String>,
    /// SASL password (for cloud authentication)
    #[serde(default)]
    pub sasl_password: Option<String>,
    /// Partitions for a topic created by this service
    #[serde(default = "default_partitions")]
    pub partitions: i32,
    /// Replication factor for a topic created by this service
    #[serde(default = "default_replication_factor")]
    pub replication_factor: i16,
    /// Topic creation timeout in milliseconds
    #[serde(default = "default_create_timeout_ms")]
    pub create_timeout_ms: i32,
    /// Longest a fetch waits for new records, in milliseconds
    #[serde(default = "default_fetch_max_wait_ms")]
    pub fetch_max_wait_ms: i32,
    /// Upper bound on bytes returned by one fetch
    #[serde(default = "default_fetch_max_bytes")]
    pub fetch_max_bytes: i32,
    /// Compression type (none, gzip, snappy, lz4, zstd)
    #[serde(default = "default_compression")]
    pub compression: String,
    /// This replica's index among the worker replicas, from 0
    #[serde(default)]
    pub member: u32,
    /// Number of worker replicas splitting the topic's partitions
    #[serde(default = "default_members")]
    pub members: u32,
}

fn default_partitions() -> i32 {
    1
}

fn default_replication_factor() -> i16 {
    1
}

fn default_create_timeout_ms() -> i32 {
    5000
}

fn default_fetch_max_wait_ms() -> i32 {
    1000
}

fn default_fetch_max_bytes() -> i32 {
    1024 * 1024
}

fn default_compression() -> String {
    "none".to_string()
}

fn default_members() -> u32 {
    1
}

impl Default for RedpandaConfig {
    fn default() -> Self {
        Self {
            brokers: vec!["localhost:9092".to_string()],
            sasl_username: None,
            sasl_password: None,
            partitions: default_partitions(),
            replication_factor: default_replication_factor(),
            create_timeout_ms: default_create_timeout_ms(),
            fetch_max_wait_ms: default_fetch_max_wait_ms(),
            fetch_max_bytes: default_fetch_max_bytes(),
            compression: default_compression(),
            member: 0,
            members: default_members(),
        }
    }
}

impl RedpandaConfig {
    /// Returns the broker list as a comma-separated string.
    pub fn broker_string(&self) -> String {
        self.brokers.join(",")
    }

    /// Rejects a replica index that no partition could ever be dealt to.
    pub fn validate_membership(&self) -> Result<(), String> {
        if self.members == 0 {
            return Err("members must be at least 1".to_string());
        }
        if self.member >= self.members {
            return Err(format!(
                "member {} is out of range for {} members",
                self.member, self.members
            ));
        }
        Ok(())
    }

    /// SASL credentials, when both halves are configured.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (&self.sasl_username, &self.sasl_password) {
            (Some(user), Some(pass)) => Some((user.as_str(), pass.as_str())),
            _ => None,
        }
    }
}
