//! ClickHouse book store against a real server.
//!
//! Needs Docker, or `BOOKSHELF_TEST_CLICKHOUSE_URL` pointing at a server.
//! Run with `cargo test -p integration-tests --test clickhouse_store -- --ignored`.

use bookshelf_core::{BookFields, BookId, OffsetKey, OffsetStore};
use integration_tests::containers::TestContainers;
use integration_tests::mocks::RecordingQueue;
use std::sync::Arc;
use storage::{health, BookStore, ClickHouseClient, ClickHouseOffsetStore, ClickHouseStore};

async fn store() -> (TestContainers, ClickHouseStore, RecordingQueue) {
    let containers = TestContainers::start().await;
    let client = ClickHouseClient::new(containers.clickhouse.clone());
    health::init_schema(&client)
        .await
        .expect("Failed to initialize schema");

    let queue = RecordingQueue::new();
    let store = ClickHouseStore::new(client, Arc::new(queue.clone()));
    (containers, store, queue)
}

#[tokio::test]
#[ignore = "requires docker"]
async fn test_book_lifecycle() {
    let (_containers, store, queue) = store().await;
    assert!(store.health_check().await);

    let created = store
        .create(BookFields::titled("como estas"), true)
        .await
        .unwrap();
    assert_eq!(queue.queued(), vec![created.id.clone()]);
    assert_eq!(store.read(&created.id).await.unwrap(), created);

    let mut fields = created.fields.clone();
    fields.author = Some("A. Autor".into());
    let updated = store.update(&created.id, fields, false).await.unwrap();
    assert_eq!(store.read(&created.id).await.unwrap(), updated);
    assert_eq!(queue.queued().len(), 1);

    store.delete(&created.id).await.unwrap();
    assert!(store.read(&created.id).await.unwrap_err().is_not_found());
    store.delete(&created.id).await.unwrap();
}

#[tokio::test]
#[ignore = "requires docker"]
async fn test_update_missing_book_fails() {
    let (_containers, store, queue) = store().await;

    let err = store
        .update(&BookId::new("no-such-book"), BookFields::titled("x"), true)
        .await
        .unwrap_err();

    assert!(err.is_not_found());
    assert!(queue.queued().is_empty());
}

#[tokio::test]
#[ignore = "requires docker"]
async fn test_list_pages_by_title() {
    let (_containers, store, _) = store().await;
    for title in ["c", "a", "b"] {
        store.create(BookFields::titled(title), false).await.unwrap();
    }

    let first = store.list(2, None).await.unwrap();
    let titles: Vec<_> = first
        .items
        .iter()
        .map(|b| b.fields.title.clone().unwrap_or_default())
        .collect();
    assert_eq!(titles, vec!["a", "b"]);

    let token = first.next_page_token.expect("expected a next page");
    let second = store.list(2, Some(&token)).await.unwrap();
    assert_eq!(second.items.len(), 1);
    assert_eq!(second.next_page_token, None);
}

#[tokio::test]
#[ignore = "requires docker"]
async fn test_offsets_survive_a_new_store() {
    let containers = TestContainers::start().await;
    let client = ClickHouseClient::new(containers.clickhouse.clone());
    health::init_schema(&client)
        .await
        .expect("Failed to initialize schema");
    let key = OffsetKey::new("shared-worker-subscription", "book-process-queue", 1);

    let first = ClickHouseOffsetStore::new(client.clone());
    assert_eq!(first.load(&key).await.unwrap(), None);
    first.commit(&key, 10).await.unwrap();
    first.commit(&key, 11).await.unwrap();

    let restarted = ClickHouseOffsetStore::new(client);
    assert_eq!(restarted.load(&key).await.unwrap(), Some(11));
    assert_eq!(
        restarted
            .load(&OffsetKey::new("shared-worker-subscription", "book-process-queue", 0))
            .await
            .unwrap(),
        None
    );
}
