//! Core types for the bookshelf enrichment pipeline.
//!
//! Everything the web tier, the broker adapters, and the worker agree on
//! lives here: the book record, the queued work item, the volume lookup
//! response, the merge policy applied when a lookup succeeds, and where
//! subscriptions keep their read position.

pub mod book;
pub mod enrichment;
pub mod error;
pub mod offsets;
pub mod queue;
pub mod volumes;
pub mod work;

pub use book::*;
pub use enrichment::*;
pub use error::{Error, Result};
pub use offsets::*;
pub use queue::*;
pub use volumes::*;
pub use work::*;
