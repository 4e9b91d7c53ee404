//! Background enrichment worker.
//!
//! Listens on the shared worker subscription and, for every `processBook`
//! item, reads the book, looks it up by title, merges the top match, and
//! writes it back without re-queueing it.
//! - [`Worker`]: per-message pipeline and processed counter
//! - [`BooksApiClient`]: volume lookup over HTTP
//! - [`ImageMirror`]: copies cover thumbnails into blob storage
//! - [`Listener`]: subscription lifecycle
//! - [`routes::router`]: health and status endpoints

pub mod images;
pub mod lookup;
pub mod processor;
pub mod routes;
pub mod subscriber;

pub use images::*;
pub use lookup::*;
pub use processor::*;
pub use routes::router;
pub use subscriber::*;
