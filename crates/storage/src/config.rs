//! Storage configuration.

use serde::{Deserialize, Serialize};

/// Where book records live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataBackend {
    Memory,
    Clickhouse,
}

impl std::str::FromStr for DataBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "clickhouse" => Ok(Self::Clickhouse),
            other => Err(format!("unknown data backend: {}", other)),
        }
    }
}

/// Storage configuration: the book store plus the cover blob store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_backend")]
    pub backend: DataBackend,
    #[serde(default)]
    pub clickhouse: ClickHouseConfig,
    #[serde(default)]
    pub blobs: BlobConfig,
}

fn default_backend() -> DataBackend {
    DataBackend::Memory
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            clickhouse: ClickHouseConfig::default(),
            blobs: BlobConfig::default(),
        }
    }
}

/// ClickHouse client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClickHouseConfig {
    /// ClickHouse HTTP URL
    pub url: String,
    /// Database name
    #[serde(default = "default_database")]
    pub database: String,
    /// Username (optional)
    pub username: Option<String>,
    /// Password (optional)
    pub password: Option<String>,
}

fn default_database() -> String {
    "bookshelf".to_string()
}

impl Default for ClickHouseConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8123".to_string(),
            database: default_database(),
            username: None,
            password: None,
        }
    }
}

/// Cover image storage. Without a bucket, covers are not mirrored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlobConfig {
    /// Cloud Storage bucket name
    #[serde(default)]
    pub bucket: Option<String>,
    /// OAuth bearer token for uploads
    #[serde(default)]
    pub access_token: Option<String>,
    /// Base of the JSON upload API
    #[serde(default = "default_upload_url")]
    pub upload_url: String,
    /// Base of public object URLs
    #[serde(default = "default_public_url")]
    pub public_url: String,
}

fn default_upload_url() -> String {
    "https://storage.googleapis.com/upload/storage/v1".to_string()
}

fn default_public_url() -> String {
    "https://storage.googleapis.com".to_string()
}

impl Default for BlobConfig {
    fn default() -> Self {
        Self {
            bucket: None,
            access_token: None,
            upload_url: default_upload_url(),
            public_url: default_public_url(),
        }
    }
}
