//! Work items carried on the processing topic.
//!
//! Wire format is a JSON object tagged by `action`:
//! `{"action": "processBook", "bookId": 1}`.

use serde::{Deserialize, Serialize};

use crate::book::BookId;
use crate::error::Result;

/// One unit of background work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action")]
pub enum WorkItem {
    /// Look the book up and merge what is found into the stored record.
    #[serde(rename = "processBook", rename_all = "camelCase")]
    ProcessBook { book_id: BookId },

    /// Any action this build does not know about.
    #[serde(other)]
    Unknown,
}

impl WorkItem {
    pub fn process_book(book_id: impl Into<BookId>) -> Self {
        Self::ProcessBook {
            book_id: book_id.into(),
        }
    }

    /// Serializes the item for the broker.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Parses a delivered payload.
    pub fn from_bytes(payload: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(payload)?)
    }
}
