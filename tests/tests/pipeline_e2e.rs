//! End-to-end pipeline tests: web write, queue, worker, write-back.

use axum_test::TestServer;
use bookshelf_core::{Book, BookFields, BookId, WorkItem};
use bytes::Bytes;
use integration_tests::fixtures::{
    book_json, como_estas, volume, volumes, with_description, with_thumbnail,
};
use integration_tests::mocks::{StubCovers, StubLookup};
use integration_tests::setup::{wait_until, Pipeline};
use pubsub::{Broker, InMemoryBroker, Topic, DEFAULT_SUBSCRIPTION, DEFAULT_TOPIC};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use storage::BookStore;
use worker::{Listener, Worker};

async fn create(server: &TestServer, body: serde_json::Value) -> Book {
    let response = server.post("/api/books").json(&body).await;
    response.assert_status_ok();
    response.json::<Book>()
}

async fn publish_raw(broker: &InMemoryBroker, payload: &'static [u8]) {
    broker
        .publish(&Topic::new(DEFAULT_TOPIC), Bytes::from_static(payload))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_created_book_is_enriched_from_top_match() {
    let pipeline = Pipeline::start(volumes(vec![
        como_estas(),
        volume("Something Else", &["Other"], "1999"),
    ]))
    .await;
    let server = TestServer::new(pipeline.router.clone()).unwrap();

    let book = create(&server, book_json("como estas")).await;
    pipeline.wait_for_processed(1).await;

    assert_eq!(pipeline.lookup.queries(), vec!["como estas".to_string()]);

    let updates = pipeline.store.updates();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].id, book.id);
    assert!(!updates[0].queue_book);
    assert_eq!(
        updates[0].fields,
        BookFields {
            title: Some("Como Estás".into()),
            author: Some("A. Autor".into()),
            published_date: Some("2001".into()),
            ..Default::default()
        }
    );

    let stored = server
        .get(&format!("/api/books/{}", book.id))
        .await
        .json::<serde_json::Value>();
    assert_eq!(stored["title"], "Como Estás");
    assert_eq!(stored["author"], "A. Autor");
    assert_eq!(stored["publishedDate"], "2001");
}

#[tokio::test]
async fn test_worker_write_back_does_not_requeue() {
    let pipeline = Pipeline::start(volumes(vec![como_estas()])).await;
    let server = TestServer::new(pipeline.router.clone()).unwrap();

    create(&server, book_json("como estas")).await;
    pipeline.wait_for_processed(1).await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(pipeline.published(), 1);
    assert_eq!(pipeline.processed(), 1);
    assert_eq!(pipeline.lookup.queries().len(), 1);
}

#[tokio::test]
async fn test_user_update_queues_again() {
    let pipeline = Pipeline::start(volumes(vec![como_estas()])).await;
    let server = TestServer::new(pipeline.router.clone()).unwrap();

    let book = create(&server, book_json("como estas")).await;
    pipeline.wait_for_processed(1).await;

    server
        .put(&format!("/api/books/{}", book.id))
        .json(&json!({ "title": "como estas otra vez" }))
        .await
        .assert_status_ok();
    pipeline.wait_for_processed(2).await;

    assert_eq!(pipeline.published(), 2);
    assert_eq!(pipeline.lookup.queries()[1], "como estas otra vez");
}

#[tokio::test]
async fn test_existing_topic_is_reused() {
    let broker = InMemoryBroker::new();
    broker.create_topic(DEFAULT_TOPIC).await.unwrap();

    let pipeline = Pipeline::start_on(broker, volumes(vec![como_estas()])).await;
    let server = TestServer::new(pipeline.router.clone()).unwrap();

    create(&server, book_json("como estas")).await;
    pipeline.wait_for_processed(1).await;

    assert_eq!(pipeline.published(), 1);
    assert_eq!(pipeline.store.updates().len(), 1);
}

#[tokio::test]
async fn test_no_match_leaves_book_untouched() {
    let pipeline = Pipeline::start(volumes(vec![])).await;
    let server = TestServer::new(pipeline.router.clone()).unwrap();

    let book = create(&server, book_json("zzzz unknown")).await;
    pipeline.wait_for_lookups(1).await;

    assert!(pipeline.store.updates().is_empty());
    assert_eq!(pipeline.processed(), 0);

    let stored = pipeline.store.read(&book.id).await.unwrap();
    assert_eq!(stored.fields, BookFields::titled("zzzz unknown"));
}

#[tokio::test]
async fn test_lookup_failure_leaves_book_untouched() {
    let pipeline = Pipeline::start(volumes(vec![como_estas()])).await;
    pipeline.lookup.set_should_fail(true);
    let server = TestServer::new(pipeline.router.clone()).unwrap();

    create(&server, book_json("como estas")).await;
    pipeline.wait_for_lookups(1).await;

    assert!(pipeline.store.updates().is_empty());
    assert_eq!(pipeline.processed(), 0);
}

#[tokio::test]
async fn test_existing_description_wins() {
    let candidate = with_description(como_estas(), "From the lookup");
    let pipeline = Pipeline::start(volumes(vec![candidate])).await;
    let server = TestServer::new(pipeline.router.clone()).unwrap();

    create(
        &server,
        json!({ "title": "como estas", "description": "Written by a reader" }),
    )
    .await;
    pipeline.wait_for_processed(1).await;

    let updates = pipeline.store.updates();
    assert_eq!(
        updates[0].fields.description.as_deref(),
        Some("Written by a reader")
    );
}

#[tokio::test]
async fn test_missing_description_is_filled() {
    let candidate = with_description(como_estas(), "From the lookup");
    let pipeline = Pipeline::start(volumes(vec![candidate])).await;
    let server = TestServer::new(pipeline.router.clone()).unwrap();

    create(&server, book_json("como estas")).await;
    pipeline.wait_for_processed(1).await;

    let updates = pipeline.store.updates();
    assert_eq!(
        updates[0].fields.description.as_deref(),
        Some("From the lookup")
    );
}

#[tokio::test]
async fn test_existing_cover_is_kept() {
    let candidate = with_thumbnail(como_estas(), "http://books.example/thumb.jpg");
    let pipeline = Pipeline::start(volumes(vec![candidate])).await;
    let server = TestServer::new(pipeline.router.clone()).unwrap();

    create(
        &server,
        json!({ "title": "como estas", "imageUrl": "https://example.com/mine.jpg" }),
    )
    .await;
    pipeline.wait_for_processed(1).await;

    assert!(pipeline.covers.sources().is_empty());
    assert_eq!(
        pipeline.store.updates()[0].fields.image_url.as_deref(),
        Some("https://example.com/mine.jpg")
    );
}

#[tokio::test]
async fn test_missing_cover_is_mirrored() {
    let candidate = with_thumbnail(como_estas(), "http://books.example/thumb.jpg");
    let pipeline = Pipeline::start(volumes(vec![candidate])).await;
    let server = TestServer::new(pipeline.router.clone()).unwrap();

    let book = create(&server, book_json("como estas")).await;
    pipeline.wait_for_processed(1).await;

    assert_eq!(
        pipeline.covers.sources(),
        vec!["http://books.example/thumb.jpg".to_string()]
    );
    assert_eq!(
        pipeline.store.updates()[0].fields.image_url,
        Some(StubCovers::url_for(&book.id))
    );
}

#[tokio::test]
async fn test_cover_failure_still_saves_merge() {
    let candidate = with_thumbnail(como_estas(), "http://books.example/thumb.jpg");
    let pipeline = Pipeline::start(volumes(vec![candidate])).await;
    pipeline.covers.set_should_fail(true);
    let server = TestServer::new(pipeline.router.clone()).unwrap();

    create(&server, book_json("como estas")).await;
    pipeline.wait_for_processed(1).await;

    let fields = &pipeline.store.updates()[0].fields;
    assert_eq!(fields.author.as_deref(), Some("A. Autor"));
    assert_eq!(fields.image_url, None);
}

#[tokio::test]
async fn test_missing_book_is_skipped() {
    let pipeline = Pipeline::start(volumes(vec![como_estas()])).await;

    let payload = WorkItem::process_book(BookId::from(999u64)).to_bytes().unwrap();
    pipeline
        .broker
        .publish(&Topic::new(DEFAULT_TOPIC), Bytes::from(payload))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(pipeline.lookup.queries().is_empty());
    assert!(pipeline.store.updates().is_empty());
    assert_eq!(pipeline.processed(), 0);
}

#[tokio::test]
async fn test_bad_messages_do_not_stop_the_worker() {
    let pipeline = Pipeline::start(volumes(vec![como_estas()])).await;
    let server = TestServer::new(pipeline.router.clone()).unwrap();

    publish_raw(&pipeline.broker, b"not json").await;
    publish_raw(&pipeline.broker, br#"{"action":"deleteBook","bookId":"1"}"#).await;

    create(&server, book_json("como estas")).await;
    pipeline.wait_for_processed(1).await;

    assert_eq!(pipeline.lookup.queries().len(), 1);
    assert_eq!(pipeline.store.updates().len(), 1);
}

#[tokio::test]
async fn test_competing_workers_process_each_book_once() {
    let pipeline = Pipeline::start(volumes(vec![como_estas()])).await;
    let server = TestServer::new(pipeline.router.clone()).unwrap();

    let second = Arc::new(Worker::new(
        pipeline.store.clone() as Arc<dyn BookStore>,
        Arc::new(StubLookup::new(volumes(vec![como_estas()]))),
        Arc::new(StubCovers::new()),
    ));
    let mut listener = Listener::new(
        Arc::new(pipeline.broker.clone()),
        DEFAULT_TOPIC,
        DEFAULT_SUBSCRIPTION,
        second.clone(),
    );
    listener.subscribe().await.unwrap();

    for i in 0..10 {
        create(&server, book_json(&format!("book {}", i))).await;
    }

    wait_until(Duration::from_secs(5), || {
        pipeline.processed() + second.processed_count() == 10
    })
    .await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(pipeline.processed() + second.processed_count(), 10);
    assert_eq!(pipeline.store.updates().len(), 10);
}

#[tokio::test]
async fn test_cancelled_listener_stops_processing() {
    let pipeline = Pipeline::start(volumes(vec![como_estas()])).await;
    let server = TestServer::new(pipeline.router.clone()).unwrap();

    pipeline.cancel.cancel();
    tokio::time::sleep(Duration::from_millis(50)).await;

    create(&server, book_json("como estas")).await;
    wait_until(Duration::from_secs(5), || pipeline.published() == 1).await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(pipeline.processed(), 0);
    assert_eq!(
        pipeline.broker.backlog(DEFAULT_TOPIC, DEFAULT_SUBSCRIPTION),
        Some(1)
    );
}
