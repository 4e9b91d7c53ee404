//! API routes.

pub mod books;
pub mod health;

use axum::{routing::get, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::state::AppState;

/// Creates the web tier router.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(
            "/api/books",
            get(books::list_handler).post(books::create_handler),
        )
        .route(
            "/api/books/:id",
            get(books::read_handler)
                .put(books::update_handler)
                .delete(books::delete_handler),
        )
        .route("/health", get(health::health_handler))
        .route("/health/ready", get(health::ready_handler))
        .route("/health/live", get(health::live_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
