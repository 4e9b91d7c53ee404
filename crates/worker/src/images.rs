//! Cover image mirroring.

use async_trait::async_trait;
use bookshelf_core::{BookId, Error, Result};
use std::sync::Arc;
use storage::{cover_object_name, BlobStore};
use tracing::info;

const DEFAULT_CONTENT_TYPE: &str = "image/jpeg";

/// Copies a remote cover into blob storage.
#[async_trait]
pub trait CoverUploader: Send + Sync {
    /// Returns the public URL of the stored copy.
    async fn mirror(&self, source_url: &str, book_id: &BookId) -> Result<String>;
}

/// Downloads the cover over HTTP and uploads it as `{bookId}.jpg`.
pub struct ImageMirror {
    http: reqwest::Client,
    blobs: Arc<dyn BlobStore>,
}

impl ImageMirror {
    pub fn new(blobs: Arc<dyn BlobStore>) -> Self {
        Self {
            http: reqwest::Client::new(),
            blobs,
        }
    }
}

#[async_trait]
impl CoverUploader for ImageMirror {
    async fn mirror(&self, source_url: &str, book_id: &BookId) -> Result<String> {
        let response = self
            .http
            .get(source_url)
            .send()
            .await
            .map_err(|e| Error::blob(format!("cover download failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::blob(format!("cover download returned {}", status)));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_string();

        let data = response
            .bytes()
            .await
            .map_err(|e| Error::blob(format!("cover download failed: {}", e)))?;

        let name = cover_object_name(book_id);
        let url = self.blobs.upload(&name, data, &content_type).await?;

        info!(book_id = %book_id, %url, "Uploaded image");
        Ok(url)
    }
}
