//! HTTP API layer for the bookshelf web tier.

pub mod response;
pub mod routes;
pub mod state;

pub use routes::router;
pub use state::AppState;
