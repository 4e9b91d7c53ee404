//! Application state shared across handlers.

use std::sync::Arc;
use storage::BookStore;

/// Shared state for the web tier.
///
/// The store already carries the enqueue-on-write producer, so handlers
/// only decide whether a write should queue the book.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn BookStore>,
}

impl AppState {
    pub fn new(store: Arc<dyn BookStore>) -> Self {
        Self { store }
    }
}
