//! Volume lookup against the public Books API.

use async_trait::async_trait;
use bookshelf_core::{Error, Result, VolumesResponse};
use reqwest::StatusCode;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Default Books API base.
pub const DEFAULT_BOOKS_API_URL: &str = "https://www.googleapis.com/books/v1";

/// Searches for volumes matching free text.
#[async_trait]
pub trait BookLookup: Send + Sync {
    /// Runs one search. An empty `items` list is a successful answer;
    /// callers decide what "no match" means.
    async fn search(&self, query: &str) -> Result<VolumesResponse>;
}

/// HTTP client for `GET {base}/volumes?q={query}`.
#[derive(Clone)]
pub struct BooksApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl BooksApiClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| Error::config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Search URL with the query percent-encoded.
    pub fn search_url(&self, query: &str) -> Result<Url> {
        let mut url = Url::parse(&format!("{}/volumes", self.base_url))
            .map_err(|e| Error::config(format!("invalid books API URL: {}", e)))?;
        url.query_pairs_mut().append_pair("q", query);
        Ok(url)
    }
}

#[async_trait]
impl BookLookup for BooksApiClient {
    async fn search(&self, query: &str) -> Result<VolumesResponse> {
        let url = self.search_url(query)?;
        debug!(%url, "Looking up volumes");

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| Error::lookup(e.to_string()))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(Error::LookupStatus {
                status: status.as_u16(),
            });
        }

        response
            .json::<VolumesResponse>()
            .await
            .map_err(|e| Error::lookup(format!("invalid response body: {}", e)))
    }
}
