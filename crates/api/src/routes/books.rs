//! Book CRUD endpoints.
//!
//! Creates and updates queue the book for background enrichment.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use bookshelf_core::{Book, BookFields, BookId};
use serde::Deserialize;
use storage::{BookPage, PAGE_SIZE};
use telemetry::metrics;
use validator::Validate;

use crate::response::ApiError;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub page_token: Option<String>,
}

/// GET /api/books - One page of books ordered by title.
pub async fn list_handler(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<BookPage>, ApiError> {
    let page = state
        .store
        .list(PAGE_SIZE, params.page_token.as_deref())
        .await?;
    Ok(Json(page))
}

/// POST /api/books
pub async fn create_handler(
    State(state): State<AppState>,
    Json(fields): Json<BookFields>,
) -> Result<Json<Book>, ApiError> {
    fields.validate()?;

    let book = state.store.create(fields, true).await?;
    metrics().books_created.inc();
    Ok(Json(book))
}

/// GET /api/books/:id
pub async fn read_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Book>, ApiError> {
    let book = state.store.read(&BookId::new(id)).await?;
    Ok(Json(book))
}

/// PUT /api/books/:id
pub async fn update_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(fields): Json<BookFields>,
) -> Result<Json<Book>, ApiError> {
    fields.validate()?;

    let book = state.store.update(&BookId::new(id), fields, true).await?;
    metrics().books_updated.inc();
    Ok(Json(book))
}

/// DELETE /api/books/:id
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<&'static str, ApiError> {
    state.store.delete(&BookId::new(id)).await?;
    metrics().books_deleted.inc();
    Ok("OK")
}
