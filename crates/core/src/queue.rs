//! Enqueue-on-write seam between storage and the broker.

use crate::book::BookId;

/// Schedules background processing of a book after a committed write.
///
/// Implementations must not block the caller and must not report failure:
/// the write has already happened, so a lost enqueue only means the book
/// is never enriched.
pub trait BookQueue: Send + Sync {
    fn queue_book(&self, id: &BookId);
}

/// Queue that drops every request. Used where no broker is wired in.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopQueue;

impl BookQueue for NoopQueue {
    fn queue_book(&self, _id: &BookId) {}
}
