//! Worker HTTP surface: a health probe and the processed-count status page.

use axum::{extract::State, routing::get, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::processor::Worker;

/// Creates the worker router.
pub fn router(worker: Arc<Worker>) -> Router {
    Router::new()
        .route("/", get(status_handler))
        .route("/health", get(health_handler))
        .route("/_ah/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(worker)
}

/// GET /health - Liveness of the worker process.
async fn health_handler() -> &'static str {
    "ok"
}

/// GET / - Running total of books this process has enriched.
async fn status_handler(State(worker): State<Arc<Worker>>) -> String {
    format!(
        "This worker has processed {} records.",
        worker.processed_count()
    )
}
