//! Web tier tests: CRUD, validation, paging, and health endpoints.

use api::{router, AppState};
use axum::http::StatusCode;
use axum_test::TestServer;
use bookshelf_core::{Book, BookId};
use integration_tests::fixtures::book_json;
use integration_tests::mocks::{FlakyBroker, RecordingQueue};
use integration_tests::setup::wait_until;
use pubsub::{InMemoryBroker, Producer, DEFAULT_TOPIC};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use storage::{BookPage, MemoryStore};

fn server() -> (TestServer, RecordingQueue) {
    let queue = RecordingQueue::new();
    let store = Arc::new(MemoryStore::new(Arc::new(queue.clone())));
    let server = TestServer::new(router(AppState::new(store))).unwrap();
    (server, queue)
}

#[tokio::test]
async fn test_create_returns_book_and_queues_it() {
    let (server, queue) = server();

    let response = server
        .post("/api/books")
        .json(&json!({ "title": "Dune", "author": "Frank Herbert" }))
        .await;

    response.assert_status_ok();
    let book: Book = response.json();
    assert_eq!(book.id, BookId::from(1u64));
    assert_eq!(book.fields.title.as_deref(), Some("Dune"));
    assert_eq!(book.fields.author.as_deref(), Some("Frank Herbert"));
    assert_eq!(queue.queued(), vec![book.id]);
}

#[tokio::test]
async fn test_broker_outage_does_not_fail_writes() {
    let inner = InMemoryBroker::new();
    let broker = FlakyBroker::new(inner.clone());
    broker.set_should_fail(true);
    let producer = Producer::new(Arc::new(broker.clone()), DEFAULT_TOPIC);
    let store = Arc::new(MemoryStore::new(Arc::new(producer)));
    let server = TestServer::new(router(AppState::new(store))).unwrap();
    let errors_before = telemetry::metrics().queue_errors.get();

    let response = server.post("/api/books").json(&book_json("Dune")).await;

    response.assert_status_ok();
    let book: Book = response.json();
    let stored: Book = server.get(&format!("/api/books/{}", book.id)).await.json();
    assert_eq!(stored, book);
    wait_until(Duration::from_secs(5), || {
        telemetry::metrics().queue_errors.get() > errors_before
    })
    .await;
    assert_eq!(inner.publish_count(), 0);

    broker.set_should_fail(false);
    server
        .post("/api/books")
        .json(&book_json("Dune Messiah"))
        .await
        .assert_status_ok();
    wait_until(Duration::from_secs(5), || inner.publish_count() == 1).await;
}

#[tokio::test]
async fn test_read_returns_camel_case_fields() {
    let (server, _) = server();
    server
        .post("/api/books")
        .json(&json!({ "title": "Dune", "publishedDate": "1965" }))
        .await
        .assert_status_ok();

    let body: Value = server.get("/api/books/1").await.json();
    assert_eq!(body, json!({ "id": "1", "title": "Dune", "publishedDate": "1965" }));
}

#[tokio::test]
async fn test_update_replaces_fields_and_queues() {
    let (server, queue) = server();
    server.post("/api/books").json(&book_json("Dune")).await;

    let response = server
        .put("/api/books/1")
        .json(&json!({ "title": "Dune Messiah" }))
        .await;

    response.assert_status_ok();
    let book: Book = response.json();
    assert_eq!(book.fields.title.as_deref(), Some("Dune Messiah"));
    assert_eq!(queue.queued().len(), 2);
}

#[tokio::test]
async fn test_update_missing_book_is_404() {
    let (server, queue) = server();

    let response = server
        .put("/api/books/42")
        .json(&book_json("Ghost"))
        .await;

    response.assert_status(StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body["code"], "NOT_FOUND");
    assert!(queue.queued().is_empty());
}

#[tokio::test]
async fn test_read_missing_book_is_404() {
    let (server, _) = server();

    let response = server.get("/api/books/42").await;

    response.assert_status(StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body["error"], "book 42 not found");
}

#[tokio::test]
async fn test_overlong_title_is_rejected() {
    let (server, queue) = server();

    let response = server
        .post("/api/books")
        .json(&book_json(&"x".repeat(256)))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["code"], "INVALID");
    assert_eq!(body["details"][0], "title: length");
    assert!(queue.queued().is_empty());
}

#[tokio::test]
async fn test_delete_is_idempotent() {
    let (server, _) = server();
    server.post("/api/books").json(&book_json("Dune")).await;

    let first = server.delete("/api/books/1").await;
    first.assert_status_ok();
    first.assert_text("OK");

    server
        .get("/api/books/1")
        .await
        .assert_status(StatusCode::NOT_FOUND);

    let again = server.delete("/api/books/1").await;
    again.assert_status_ok();
    again.assert_text("OK");
}

#[tokio::test]
async fn test_list_pages_by_title() {
    let (server, _) = server();
    // Created out of order; listing sorts by title.
    for i in (0..12).rev() {
        server
            .post("/api/books")
            .json(&book_json(&format!("Book {:02}", i)))
            .await
            .assert_status_ok();
    }

    let first: BookPage = server.get("/api/books").await.json();
    assert_eq!(first.items.len(), 10);
    assert_eq!(first.items[0].fields.title.as_deref(), Some("Book 00"));
    assert_eq!(first.items[9].fields.title.as_deref(), Some("Book 09"));
    let token = first.next_page_token.expect("expected a next page");

    let second: BookPage = server
        .get("/api/books")
        .add_query_param("pageToken", &token)
        .await
        .json();
    assert_eq!(second.items.len(), 2);
    assert_eq!(second.items[1].fields.title.as_deref(), Some("Book 11"));
    assert_eq!(second.next_page_token, None);
}

#[tokio::test]
async fn test_empty_list_has_no_token() {
    let (server, _) = server();

    let body: Value = server.get("/api/books").await.json();
    assert_eq!(body["items"], json!([]));
    assert!(body.get("nextPageToken").map_or(true, Value::is_null));
}

#[tokio::test]
async fn test_bad_page_token_is_400() {
    let (server, _) = server();

    server
        .get("/api/books")
        .add_query_param("pageToken", "not-a-number")
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_health_endpoints() {
    let (server, _) = server();

    let response = server.get("/health").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert!(body["status"].is_string());
    assert!(body["components"].is_array());
    assert!(body["metrics"].is_object());

    server.get("/health/ready").await.assert_status_ok();
    server.get("/health/live").await.assert_status_ok();
}
