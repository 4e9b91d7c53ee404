//! Process configuration.
//!
//! Layered: struct defaults, then `config/default.toml` if present, then
//! `BOOKSHELF__*` environment variables, then the flat `BOOKSHELF_*`
//! overrides below.

use anyhow::{anyhow, Context, Result};
use pubsub::PubSubConfig;
use serde::{Deserialize, Serialize};
use storage::StorageConfig;
use worker::DEFAULT_BOOKS_API_URL;

/// Which halves of the system this process runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Web tier only: serves the books API and enqueues work.
    Frontend,
    /// Background worker only.
    Worker,
    /// Both, sharing one broker and store. For local development.
    All,
}

impl Role {
    pub fn runs_frontend(self) -> bool {
        matches!(self, Self::Frontend | Self::All)
    }

    pub fn runs_worker(self) -> bool {
        matches!(self, Self::Worker | Self::All)
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "frontend" | "web" => Ok(Self::Frontend),
            "worker" => Ok(Self::Worker),
            "all" => Ok(Self::All),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Worker status port when the web tier holds `port`
    #[serde(default = "default_worker_port")]
    pub worker_port: u16,
    #[serde(default = "default_role")]
    pub role: Role,
    #[serde(default = "default_books_api_url")]
    pub books_api_url: String,

    #[serde(default)]
    pub pubsub: PubSubConfig,

    #[serde(default)]
    pub storage: StorageConfig,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_worker_port() -> u16 {
    8081
}

fn default_role() -> Role {
    Role::All
}

fn default_books_api_url() -> String {
    DEFAULT_BOOKS_API_URL.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            worker_port: default_worker_port(),
            role: default_role(),
            books_api_url: default_books_api_url(),
            pubsub: PubSubConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from files and environment.
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Config::try_from(&Config::default())?)
            .add_source(
                config::File::with_name("config/default")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(
                config::Environment::default()
                    .separator("__")
                    .prefix("BOOKSHELF")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        let mut config: Config = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Port of the worker's status server. A worker-only process takes the
    /// main port.
    pub fn worker_http_port(&self) -> u16 {
        match self.role {
            Role::Worker => self.port,
            _ => self.worker_port,
        }
    }

    /// Applies the flat `BOOKSHELF_*` variables.
    ///
    /// The config crate cannot split nested keys that contain underscores,
    /// so these are read by hand.
    pub fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(host) = var("BOOKSHELF_HOST") {
            self.host = host;
        }
        if let Some(port) = var("BOOKSHELF_PORT") {
            self.port = parse("BOOKSHELF_PORT", &port)?;
        }
        if let Some(port) = var("BOOKSHELF_WORKER_PORT") {
            self.worker_port = parse("BOOKSHELF_WORKER_PORT", &port)?;
        }
        if let Some(role) = var("BOOKSHELF_ROLE") {
            self.role = parse("BOOKSHELF_ROLE", &role)?;
        }
        if let Some(url) = var("BOOKSHELF_BOOKS_API_URL") {
            self.books_api_url = url;
        }

        // Broker
        if let Some(backend) = var("BOOKSHELF_BROKER_BACKEND") {
            self.pubsub.backend = parse("BOOKSHELF_BROKER_BACKEND", &backend)?;
        }
        if let Some(topic) = var("BOOKSHELF_TOPIC_NAME") {
            self.pubsub.topic = topic;
        }
        if let Some(subscription) = var("BOOKSHELF_SUBSCRIPTION_NAME") {
            self.pubsub.subscription = subscription;
        }
        if let Some(brokers) = var("BOOKSHELF_REDPANDA_BROKERS") {
            self.pubsub.redpanda.brokers =
                brokers.split(',').map(|s| s.trim().to_string()).collect();
        }
        if let Some(username) = var("BOOKSHELF_REDPANDA_SASL_USERNAME") {
            self.pubsub.redpanda.sasl_username = Some(username);
        }
        if let Some(password) = var("BOOKSHELF_REDPANDA_SASL_PASSWORD") {
            self.pubsub.redpanda.sasl_password = Some(password);
        }
        if let Some(partitions) = var("BOOKSHELF_REDPANDA_PARTITIONS") {
            self.pubsub.redpanda.partitions = parse("BOOKSHELF_REDPANDA_PARTITIONS", &partitions)?;
        }
        if let Some(member) = var("BOOKSHELF_WORKER_MEMBER") {
            self.pubsub.redpanda.member = parse("BOOKSHELF_WORKER_MEMBER", &member)?;
        }
        if let Some(members) = var("BOOKSHELF_WORKER_MEMBERS") {
            self.pubsub.redpanda.members = parse("BOOKSHELF_WORKER_MEMBERS", &members)?;
        }
        self.pubsub
            .redpanda
            .validate_membership()
            .map_err(|e| anyhow!("invalid worker membership: {}", e))?;

        // Storage
        if let Some(backend) = var("BOOKSHELF_DATA_BACKEND") {
            self.storage.backend = parse("BOOKSHELF_DATA_BACKEND", &backend)?;
        }
        if let Some(url) = var("BOOKSHELF_CLICKHOUSE_URL") {
            self.storage.clickhouse.url = url;
        }
        if let Some(database) = var("BOOKSHELF_CLICKHOUSE_DATABASE") {
            self.storage.clickhouse.database = database;
        }
        if let Some(username) = var("BOOKSHELF_CLICKHOUSE_USERNAME") {
            self.storage.clickhouse.username = Some(username);
        }
        if let Some(password) = var("BOOKSHELF_CLICKHOUSE_PASSWORD") {
            self.storage.clickhouse.password = Some(password);
        }
        if let Some(bucket) = var("BOOKSHELF_CLOUD_BUCKET") {
            self.storage.blobs.bucket = Some(bucket);
        }
        if let Some(token) = var("BOOKSHELF_CLOUD_ACCESS_TOKEN") {
            self.storage.blobs.access_token = Some(token);
        }

        Ok(())
    }
}

fn parse<T: std::str::FromStr>(key: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| anyhow!("invalid {}={:?}: {}", key, value, e))
}
