//! Per-message processing: read, enrich, write.

use async_trait::async_trait;
use bookshelf_core::{Book, BookId, EnrichmentResult, Error, Result, WorkItem};
use bytes::Bytes;
use pubsub::MessageHandler;
use std::sync::Arc;
use std::time::Instant;
use storage::BookStore;
use telemetry::{metrics, Counter};
use tracing::{debug, error, info, warn};

use crate::images::CoverUploader;
use crate::lookup::BookLookup;

/// Enriches stored books from the volume lookup.
///
/// `processed_count` counts books this process has successfully written
/// back. It is per process and starts at zero on every restart.
pub struct Worker {
    store: Arc<dyn BookStore>,
    lookup: Arc<dyn BookLookup>,
    covers: Option<Arc<dyn CoverUploader>>,
    processed: Counter,
}

impl Worker {
    pub fn new(
        store: Arc<dyn BookStore>,
        lookup: Arc<dyn BookLookup>,
        covers: Arc<dyn CoverUploader>,
    ) -> Self {
        Self {
            store,
            lookup,
            covers: Some(covers),
            processed: Counter::new(),
        }
    }

    /// A worker with no cover bucket. Covers are left as they are.
    pub fn without_covers(store: Arc<dyn BookStore>, lookup: Arc<dyn BookLookup>) -> Self {
        Self {
            store,
            lookup,
            covers: None,
            processed: Counter::new(),
        }
    }

    pub fn processed_count(&self) -> u64 {
        self.processed.get()
    }

    /// Runs the full pipeline for one book and returns what was saved.
    ///
    /// Fails without touching storage when the book is missing or the
    /// lookup has no match. A failed cover copy is logged and the rest of
    /// the merge is still saved.
    pub async fn process_book(&self, id: &BookId) -> Result<Book> {
        let start = Instant::now();
        let mut book = self.store.read(id).await?;

        let query = book.fields.title.clone().unwrap_or_default();
        let lookup_start = Instant::now();
        let response = self.lookup.search(&query).await;
        metrics()
            .lookup_latency_ms
            .observe(lookup_start.elapsed().as_millis() as u64);

        let found = match response?.top() {
            Some(top) => EnrichmentResult::from(top),
            None => {
                metrics().lookup_misses.inc();
                return Err(Error::NoVolumeMatch { query });
            }
        };

        found.merge_into(&mut book.fields);

        if let Some(source) = found.cover_to_fetch(&book.fields) {
            match self.covers {
                Some(ref covers) => match covers.mirror(source, &book.id).await {
                    Ok(url) => {
                        metrics().covers_mirrored.inc();
                        book.fields.image_url = Some(url);
                    }
                    Err(e) => {
                        metrics().cover_errors.inc();
                        warn!(book_id = %id, error = %e, "Failed to copy cover image");
                    }
                },
                None => debug!(book_id = %id, "No cover bucket, skipping cover"),
            }
        }

        let saved = self.store.update(&book.id, book.fields, false).await?;

        self.processed.inc();
        metrics()
            .processing_latency_ms
            .observe(start.elapsed().as_millis() as u64);
        info!("Updated book {}", id);

        Ok(saved)
    }

    /// Decodes one delivered payload and acts on it. Never fails: every
    /// outcome is logged, and the broker acks the message regardless.
    pub async fn dispatch(&self, payload: &[u8]) {
        let m = metrics();
        m.messages_received.inc();

        let item = match WorkItem::from_bytes(payload) {
            Ok(item) => item,
            Err(e) => {
                m.malformed_messages.inc();
                warn!(error = %e, "Dropping malformed work item");
                return;
            }
        };

        match item {
            WorkItem::ProcessBook { book_id } => {
                info!("Received request to process book {}", book_id);

                m.messages_in_flight.inc();
                let result = self.process_book(&book_id).await;
                m.messages_in_flight.dec();

                if let Err(e) = result {
                    m.processing_errors.inc();
                    error!(book_id = %book_id, error = %e, "Error occurred processing book");
                }
            }
            WorkItem::Unknown => {
                m.unknown_actions.inc();
                warn!(
                    payload = %String::from_utf8_lossy(payload),
                    "Unknown request"
                );
            }
        }
    }
}

#[async_trait]
impl MessageHandler for Worker {
    async fn handle(&self, payload: Bytes) {
        self.dispatch(&payload).await;
    }
}
