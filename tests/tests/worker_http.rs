//! Worker status surface.

use axum_test::TestServer;
use integration_tests::fixtures::{book_json, como_estas, volumes};
use integration_tests::setup::Pipeline;

#[tokio::test]
async fn test_status_page_counts_processed_books() {
    let pipeline = Pipeline::start(volumes(vec![como_estas()])).await;
    let web = TestServer::new(pipeline.router.clone()).unwrap();
    let status = TestServer::new(worker::router(pipeline.worker.clone())).unwrap();

    status
        .get("/")
        .await
        .assert_text("This worker has processed 0 records.");

    web.post("/api/books")
        .json(&book_json("como estas"))
        .await
        .assert_status_ok();
    pipeline.wait_for_processed(1).await;

    status
        .get("/")
        .await
        .assert_text("This worker has processed 1 records.");
}

#[tokio::test]
async fn test_failed_lookup_is_not_counted() {
    let pipeline = Pipeline::start(volumes(vec![])).await;
    let web = TestServer::new(pipeline.router.clone()).unwrap();
    let status = TestServer::new(worker::router(pipeline.worker.clone())).unwrap();

    web.post("/api/books")
        .json(&book_json("nothing matches this"))
        .await
        .assert_status_ok();
    pipeline.wait_for_lookups(1).await;

    status
        .get("/")
        .await
        .assert_text("This worker has processed 0 records.");
}

#[tokio::test]
async fn test_health_endpoints() {
    let pipeline = Pipeline::start(volumes(vec![])).await;
    let status = TestServer::new(worker::router(pipeline.worker.clone())).unwrap();

    status.get("/health").await.assert_text("ok");
    status.get("/_ah/health").await.assert_text("ok");
}
