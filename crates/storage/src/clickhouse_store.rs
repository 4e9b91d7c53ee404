//! ClickHouse-backed book store.

use async_trait::async_trait;
use bookshelf_core::{Book, BookFields, BookId, BookQueue, Error, Result};
use chrono::Utc;
use clickhouse::Row;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;
use uuid::Uuid;

use crate::client::ClickHouseClient;
use crate::schema::BOOK_COLUMNS;
use crate::store::{parse_offset_token, BookPage, BookStore};

/// One version of a book.
#[derive(Debug, Clone, Row, Serialize, Deserialize)]
pub struct BookRow {
    pub id: String,
    pub title: Option<String>,
    pub author: Option<String>,
    pub published_date: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub created_by: Option<String>,
    pub created_by_id: Option<String>,
    pub deleted: u8,
    pub version: u64,
}

impl BookRow {
    fn new(id: &BookId, fields: BookFields, version: u64) -> Self {
        Self {
            id: id.to_string(),
            title: fields.title,
            author: fields.author,
            published_date: fields.published_date,
            description: fields.description,
            image_url: fields.image_url,
            created_by: fields.created_by,
            created_by_id: fields.created_by_id,
            deleted: 0,
            version,
        }
    }

    fn tombstone(id: &BookId, version: u64) -> Self {
        Self {
            deleted: 1,
            ..Self::new(id, BookFields::default(), version)
        }
    }
}

impl From<BookRow> for Book {
    fn from(row: BookRow) -> Self {
        Book::new(
            row.id,
            BookFields {
                title: row.title,
                author: row.author,
                published_date: row.published_date,
                description: row.description,
                image_url: row.image_url,
                created_by: row.created_by,
                created_by_id: row.created_by_id,
            },
        )
    }
}

/// Row versions for `ReplacingMergeTree` tables: a microsecond clock,
/// bumped so two writes from this process never share a version.
#[derive(Debug, Default)]
pub(crate) struct VersionClock {
    last: AtomicU64,
}

impl VersionClock {
    pub(crate) fn next(&self) -> u64 {
        let now = Utc::now().timestamp_micros().max(0) as u64;
        let mut last = self.last.load(Ordering::Relaxed);
        loop {
            let next = now.max(last + 1);
            match self
                .last
                .compare_exchange_weak(last, next, Ordering::Relaxed, Ordering::Relaxed)
            {
                Ok(_) => return next,
                Err(current) => last = current,
            }
        }
    }
}

/// Book store over a `ReplacingMergeTree` table. Ids are UUIDs.
pub struct ClickHouseStore {
    client: ClickHouseClient,
    queue: Arc<dyn BookQueue>,
    versions: VersionClock,
}

impl ClickHouseStore {
    pub fn new(client: ClickHouseClient, queue: Arc<dyn BookQueue>) -> Self {
        Self {
            client,
            queue,
            versions: VersionClock::default(),
        }
    }

    fn next_version(&self) -> u64 {
        self.versions.next()
    }

    async fn insert_row(&self, row: &BookRow) -> Result<()> {
        let start = Instant::now();

        let mut insert = self
            .client
            .inner()
            .insert("books")
            .map_err(|e| Error::storage(format!("Insert error: {}", e)))?;

        insert
            .write(row)
            .await
            .map_err(|e| Error::storage(format!("Write error: {}", e)))?;

        insert
            .end()
            .await
            .map_err(|e| Error::storage(format!("End error: {}", e)))?;

        debug!(
            book_id = %row.id,
            version = row.version,
            latency_ms = %start.elapsed().as_millis(),
            "Inserted book row"
        );
        Ok(())
    }

    async fn find(&self, id: &BookId) -> Result<Option<BookRow>> {
        let sql = format!(
            "SELECT {} FROM books FINAL WHERE id = ? AND deleted = 0 LIMIT 1",
            BOOK_COLUMNS
        );
        self.client
            .inner()
            .query(&sql)
            .bind(id.as_str())
            .fetch_optional::<BookRow>()
            .await
            .map_err(|e| Error::storage(format!("Query error: {}", e)))
    }

    fn after_write(&self, id: &BookId, queue_book: bool) {
        if queue_book {
            self.queue.queue_book(id);
        }
    }
}

#[async_trait]
impl BookStore for ClickHouseStore {
    async fn list(&self, limit: usize, token: Option<&str>) -> Result<BookPage> {
        let offset = parse_offset_token(token)?;
        let sql = format!(
            "SELECT {} FROM books FINAL WHERE deleted = 0 ORDER BY title, id LIMIT ? OFFSET ?",
            BOOK_COLUMNS
        );

        // One extra row tells us whether another page exists.
        let mut rows = self
            .client
            .inner()
            .query(&sql)
            .bind(limit as u64 + 1)
            .bind(offset as u64)
            .fetch_all::<BookRow>()
            .await
            .map_err(|e| Error::storage(format!("Query error: {}", e)))?;

        let has_more = rows.len() > limit;
        rows.truncate(limit);
        let next_page_token = has_more.then(|| (offset + rows.len()).to_string());

        Ok(BookPage {
            items: rows.into_iter().map(Book::from).collect(),
            next_page_token,
        })
    }

    async fn create(&self, fields: BookFields, queue_book: bool) -> Result<Book> {
        let id = BookId::new(Uuid::new_v4().to_string());
        let row = BookRow::new(&id, fields, self.next_version());
        self.insert_row(&row).await?;

        self.after_write(&id, queue_book);
        Ok(Book::from(row))
    }

    async fn read(&self, id: &BookId) -> Result<Book> {
        self.find(id)
            .await?
            .map(Book::from)
            .ok_or_else(|| Error::BookNotFound(id.clone()))
    }

    async fn update(&self, id: &BookId, fields: BookFields, queue_book: bool) -> Result<Book> {
        if self.find(id).await?.is_none() {
            return Err(Error::BookNotFound(id.clone()));
        }

        let row = BookRow::new(id, fields, self.next_version());
        self.insert_row(&row).await?;

        self.after_write(id, queue_book);
        Ok(Book::from(row))
    }

    async fn delete(&self, id: &BookId) -> Result<()> {
        if self.find(id).await?.is_some() {
            self.insert_row(&BookRow::tombstone(id, self.next_version()))
                .await?;
        }
        Ok(())
    }

    async fn health_check(&self) -> bool {
        crate::health::check_connection(&self.client).await
    }
}
