//! The `BookStore` abstraction shared by the web tier and the worker.

use async_trait::async_trait;
use bookshelf_core::{Book, BookFields, BookId, Error, Result};
use serde::{Deserialize, Serialize};

/// Books per page in listings.
pub const PAGE_SIZE: usize = 10;

/// One page of a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookPage {
    pub items: Vec<Book>,
    /// Opaque token for the next page; absent on the last page
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}

/// Persistent book records.
///
/// `create` and `update` take a `queue_book` flag. When set, the store hands
/// the committed id to its [`BookQueue`](bookshelf_core::BookQueue) after the
/// write succeeds. The web tier passes `true`; the worker's own write passes
/// `false` so enrichment never re-triggers itself.
#[async_trait]
pub trait BookStore: Send + Sync {
    /// Lists books ordered by title.
    async fn list(&self, limit: usize, token: Option<&str>) -> Result<BookPage>;

    /// Stores a new book and assigns its id.
    async fn create(&self, fields: BookFields, queue_book: bool) -> Result<Book>;

    /// Fails with [`Error::BookNotFound`](bookshelf_core::Error::BookNotFound)
    /// if the id is unknown.
    async fn read(&self, id: &BookId) -> Result<Book>;

    /// Replaces every field of an existing book. Never creates one.
    async fn update(&self, id: &BookId, fields: BookFields, queue_book: bool) -> Result<Book>;

    /// Removes a book. Deleting an unknown id is not an error.
    async fn delete(&self, id: &BookId) -> Result<()>;

    async fn health_check(&self) -> bool {
        true
    }
}

/// Both stores page with a decimal row offset.
pub(crate) fn parse_offset_token(token: Option<&str>) -> Result<usize> {
    match token {
        None | Some("") => Ok(0),
        Some(t) => t
            .parse()
            .map_err(|_| Error::validation(format!("invalid page token: {}", t))),
    }
}
