//! Public-read object storage for cover images.

use async_trait::async_trait;
use bookshelf_core::{Error, Result};
use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::{debug, error};
use url::Url;

use crate::config::BlobConfig;

/// Stores bytes under a name and returns a URL anyone can fetch them from.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn upload(&self, name: &str, data: Bytes, content_type: &str) -> Result<String>;
}

/// Object name for a book's cover.
pub fn cover_object_name(book_id: &bookshelf_core::BookId) -> String {
    format!("{}.jpg", book_id)
}

/// An object held by [`MemoryBlobStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    pub data: Bytes,
    pub content_type: String,
}

/// Keeps objects in process memory.
pub struct MemoryBlobStore {
    base_url: String,
    objects: RwLock<HashMap<String, StoredBlob>>,
}

impl MemoryBlobStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            objects: RwLock::new(HashMap::new()),
        }
    }

    pub fn get(&self, name: &str) -> Option<StoredBlob> {
        self.objects.read().get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryBlobStore {
    fn default() -> Self {
        Self::new("memory://covers")
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn upload(&self, name: &str, data: Bytes, content_type: &str) -> Result<String> {
        self.objects.write().insert(
            name.to_string(),
            StoredBlob {
                data,
                content_type: content_type.to_string(),
            },
        );
        Ok(format!("{}/{}", self.base_url.trim_end_matches('/'), name))
    }
}

/// Google Cloud Storage bucket written through the JSON media-upload API.
/// Objects are uploaded with the `publicRead` ACL.
pub struct GcsBlobStore {
    http: reqwest::Client,
    bucket: String,
    access_token: Option<String>,
    upload_url: String,
    public_url: String,
}

impl GcsBlobStore {
    pub fn new(bucket: impl Into<String>, config: &BlobConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            bucket: bucket.into(),
            access_token: config.access_token.clone(),
            upload_url: config.upload_url.trim_end_matches('/').to_string(),
            public_url: config.public_url.trim_end_matches('/').to_string(),
        }
    }

    fn upload_endpoint(&self, name: &str) -> Result<Url> {
        let mut url = Url::parse(&format!("{}/b/{}/o", self.upload_url, self.bucket))
            .map_err(|e| Error::blob(format!("invalid upload URL: {}", e)))?;
        url.query_pairs_mut()
            .append_pair("uploadType", "media")
            .append_pair("name", name)
            .append_pair("predefinedAcl", "publicRead");
        Ok(url)
    }

    /// `https://storage.googleapis.com/{bucket}/{name}` unless overridden.
    pub fn public_url(&self, name: &str) -> String {
        format!("{}/{}/{}", self.public_url, self.bucket, name)
    }
}

#[async_trait]
impl BlobStore for GcsBlobStore {
    async fn upload(&self, name: &str, data: Bytes, content_type: &str) -> Result<String> {
        let mut request = self
            .http
            .post(self.upload_endpoint(name)?)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(data);

        if let Some(ref token) = self.access_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::blob(format!("upload failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            error!(bucket = %self.bucket, object = %name, status = %status, "Cloud Storage upload rejected");
            return Err(Error::blob(format!("upload returned {}", status)));
        }

        debug!(bucket = %self.bucket, object = %name, "Uploaded object");
        Ok(self.public_url(name))
    }
}
