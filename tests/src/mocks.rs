//! Mock implementations for testing.

use async_trait::async_trait;
use bookshelf_core::{Book, BookFields, BookId, BookQueue, Error, Result, VolumesResponse};
use bytes::Bytes;
use parking_lot::Mutex;
use pubsub::{Broker, InMemoryBroker, MessageHandler, Subscription, Topic};
use std::sync::Arc;
use storage::{BookPage, BookStore};
use worker::{BookLookup, CoverUploader};

/// Queue that remembers what the store asked it to enqueue.
#[derive(Clone, Default)]
pub struct RecordingQueue {
    queued: Arc<Mutex<Vec<BookId>>>,
}

impl RecordingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queued(&self) -> Vec<BookId> {
        self.queued.lock().clone()
    }
}

impl BookQueue for RecordingQueue {
    fn queue_book(&self, id: &BookId) {
        self.queued.lock().push(id.clone());
    }
}

/// Lookup that answers every query with the same canned response.
#[derive(Clone, Default)]
pub struct StubLookup {
    response: Arc<Mutex<VolumesResponse>>,
    queries: Arc<Mutex<Vec<String>>>,
    should_fail: Arc<Mutex<bool>>,
}

impl StubLookup {
    pub fn new(response: VolumesResponse) -> Self {
        let stub = Self::default();
        stub.set_response(response);
        stub
    }

    pub fn set_response(&self, response: VolumesResponse) {
        *self.response.lock() = response;
    }

    /// Every query received, oldest first.
    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().clone()
    }

    /// Simulate the lookup service answering 503.
    pub fn set_should_fail(&self, fail: bool) {
        *self.should_fail.lock() = fail;
    }
}

#[async_trait]
impl BookLookup for StubLookup {
    async fn search(&self, query: &str) -> Result<VolumesResponse> {
        self.queries.lock().push(query.to_string());
        if *self.should_fail.lock() {
            return Err(Error::LookupStatus { status: 503 });
        }
        Ok(self.response.lock().clone())
    }
}

/// Cover uploader that records sources and hands back a fake public URL.
#[derive(Clone, Default)]
pub struct StubCovers {
    sources: Arc<Mutex<Vec<String>>>,
    should_fail: Arc<Mutex<bool>>,
}

impl StubCovers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sources(&self) -> Vec<String> {
        self.sources.lock().clone()
    }

    pub fn set_should_fail(&self, fail: bool) {
        *self.should_fail.lock() = fail;
    }

    /// URL the stub reports for a book's cover.
    pub fn url_for(book_id: &BookId) -> String {
        format!("https://storage.googleapis.com/test-bucket/{}.jpg", book_id)
    }
}

#[async_trait]
impl CoverUploader for StubCovers {
    async fn mirror(&self, source_url: &str, book_id: &BookId) -> Result<String> {
        self.sources.lock().push(source_url.to_string());
        if *self.should_fail.lock() {
            return Err(Error::blob("Mock cover failure"));
        }
        Ok(Self::url_for(book_id))
    }
}

/// One `update` call seen by [`RecordingStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateCall {
    pub id: BookId,
    pub fields: BookFields,
    pub queue_book: bool,
}

/// Wraps a real store and records every update.
pub struct RecordingStore {
    inner: Arc<dyn BookStore>,
    updates: Mutex<Vec<UpdateCall>>,
}

impl RecordingStore {
    pub fn new(inner: Arc<dyn BookStore>) -> Self {
        Self {
            inner,
            updates: Mutex::new(Vec::new()),
        }
    }

    pub fn updates(&self) -> Vec<UpdateCall> {
        self.updates.lock().clone()
    }
}

#[async_trait]
impl BookStore for RecordingStore {
    async fn list(&self, limit: usize, token: Option<&str>) -> Result<BookPage> {
        self.inner.list(limit, token).await
    }

    async fn create(&self, fields: BookFields, queue_book: bool) -> Result<Book> {
        self.inner.create(fields, queue_book).await
    }

    async fn read(&self, id: &BookId) -> Result<Book> {
        self.inner.read(id).await
    }

    async fn update(&self, id: &BookId, fields: BookFields, queue_book: bool) -> Result<Book> {
        self.updates.lock().push(UpdateCall {
            id: id.clone(),
            fields: fields.clone(),
            queue_book,
        });
        self.inner.update(id, fields, queue_book).await
    }

    async fn delete(&self, id: &BookId) -> Result<()> {
        self.inner.delete(id).await
    }
}

/// Broker that delegates to an in-memory broker but can reject publishes.
#[derive(Clone, Default)]
pub struct FlakyBroker {
    inner: InMemoryBroker,
    should_fail: Arc<Mutex<bool>>,
}

impl FlakyBroker {
    pub fn new(inner: InMemoryBroker) -> Self {
        Self {
            inner,
            should_fail: Arc::new(Mutex::new(false)),
        }
    }

    pub fn set_should_fail(&self, fail: bool) {
        *self.should_fail.lock() = fail;
    }
}

#[async_trait]
impl Broker for FlakyBroker {
    async fn create_topic(&self, name: &str) -> Result<Topic> {
        self.inner.create_topic(name).await
    }

    async fn topic(&self, name: &str) -> Result<Topic> {
        self.inner.topic(name).await
    }

    async fn publish(&self, topic: &Topic, payload: Bytes) -> Result<()> {
        if *self.should_fail.lock() {
            return Err(Error::broker("Mock broker failure"));
        }
        self.inner.publish(topic, payload).await
    }

    async fn subscribe(
        &self,
        topic: &Topic,
        subscription: &str,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<Subscription> {
        self.inner.subscribe(topic, subscription, handler).await
    }

    async fn health_check(&self) -> bool {
        !*self.should_fail.lock()
    }
}
